//! Playback scheduling (jitter buffer)
//!
//! Inbound speech buffers arrive with network jitter but must play out
//! gap-free and strictly in arrival order. The scheduler assigns each
//! buffer a start time on the playback device clock, keeping
//! `next_start` one buffer-length ahead; an underrun (or the first
//! buffer) re-anchors `next_start` to `now + jitter_latency`.
//!
//! Scheduling and the interruption flush share a single mutex over the
//! queue and `next_start`, so a buffer that races a flush is either
//! fully discarded or scheduled fresh afterwards, never half-applied.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

/// A monotonic clock in the playback device's time base
///
/// Using the device clock (not wall-clock) for `next_start` avoids
/// drift between scheduled starts and actual output.
pub trait PlaybackClock: Send + Sync {
    /// Current device time
    fn now(&self) -> Duration;
}

/// Notifications from the scheduler to the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The last outstanding scheduled buffer finished playing
    Idle,
    /// An interruption discarded all queued and in-flight buffers
    Flushed,
}

/// A scheduled buffer awaiting (or mid-way through) playout
struct PlaybackItem {
    samples: Vec<f32>,
    start: Duration,
    cursor: usize,
}

struct Inner {
    queue: VecDeque<PlaybackItem>,
    next_start: Option<Duration>,
}

/// Jitter-buffered playback scheduler
///
/// `render` is driven by the output device callback; `push` and
/// `flush` by the session task.
pub struct PlaybackScheduler {
    inner: Mutex<Inner>,
    sample_rate: u32,
    jitter_latency: Duration,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackScheduler {
    /// Create a scheduler for the given output sample rate
    ///
    /// Returns the scheduler and the receiver for its notifications.
    #[must_use]
    pub fn new(
        sample_rate: u32,
        jitter_latency: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                next_start: None,
            }),
            sample_rate,
            jitter_latency,
            events: tx,
        };
        (scheduler, rx)
    }

    /// Schedule a decoded mono buffer for playout
    ///
    /// Returns the assigned start time, or `None` for empty buffers
    /// (dropped without touching `next_start`).
    pub fn push(&self, samples: Vec<f32>, now: Duration) -> Option<Duration> {
        if samples.is_empty() {
            return None;
        }
        let duration = self.samples_duration(samples.len());

        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        // First buffer, underrun, or an extremely late arrival: re-sync
        // rather than stacking behind a start time already in the past.
        let start = match inner.next_start {
            Some(next) if next >= now => next,
            _ => now + self.jitter_latency,
        };
        inner.next_start = Some(start + duration);
        inner.queue.push_back(PlaybackItem {
            samples,
            start,
            cursor: 0,
        });

        tracing::trace!(?start, ?duration, queued = inner.queue.len(), "buffer scheduled");
        Some(start)
    }

    /// Discard every queued and in-flight buffer (barge-in)
    ///
    /// Atomic with respect to `push` and `render`; afterwards the
    /// queue is empty and `next_start` is unset.
    pub fn flush(&self) {
        let discarded = {
            let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let discarded = inner.queue.len();
            inner.queue.clear();
            inner.next_start = None;
            discarded
        };
        if discarded > 0 {
            tracing::debug!(discarded, "playback flushed");
        }
        let _ = self.events.send(PlaybackEvent::Flushed);
    }

    /// Fill an output block starting at device time `now`
    ///
    /// Samples outside any scheduled item's interval are silence.
    /// Emits [`PlaybackEvent::Idle`] when the final outstanding item
    /// completes inside this block.
    pub fn render(&self, out: &mut [f32], now: Duration) {
        out.fill(0.0);

        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut finished_any = false;

        for (i, slot) in out.iter_mut().enumerate() {
            let t = now + self.samples_duration(i);
            loop {
                let Some(front) = inner.queue.front_mut() else {
                    break;
                };
                if t < front.start {
                    break;
                }
                if front.cursor < front.samples.len() {
                    *slot = front.samples[front.cursor];
                    front.cursor += 1;
                    break;
                }
                inner.queue.pop_front();
                finished_any = true;
            }
        }

        // An item drained exactly at the block boundary still counts
        // as complete.
        while inner
            .queue
            .front()
            .is_some_and(|item| item.cursor >= item.samples.len())
        {
            inner.queue.pop_front();
            finished_any = true;
        }

        if finished_any && inner.queue.is_empty() {
            let _ = self.events.send(PlaybackEvent::Idle);
        }
    }

    /// Number of buffers currently queued (including in-flight)
    #[must_use]
    pub fn scheduled_len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .queue
            .len()
    }

    /// The start time the next pushed buffer would extend, if set
    #[must_use]
    pub fn next_start(&self) -> Option<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .next_start
    }

    fn samples_duration(&self, count: usize) -> Duration {
        Duration::from_nanos(count as u64 * 1_000_000_000 / u64::from(self.sample_rate))
    }
}
