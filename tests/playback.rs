//! End-to-end playback scheduling: jittered arrivals rendered through
//! device-sized blocks must come out gap-free and in order.

// Samples pass through the scheduler untouched, so equality is exact.
#![allow(clippy::float_cmp)]

use std::time::Duration;

use voxlink::audio::{PlaybackEvent, PlaybackScheduler};

const RATE: u32 = 24_000;
const JITTER: Duration = Duration::from_millis(200);
/// 10ms device blocks, an exact number of samples at 24kHz
const BLOCK: usize = 240;

fn chunk(ms: u64, value: f32) -> Vec<f32> {
    vec![value; (u64::from(RATE) * ms / 1000) as usize]
}

/// Render `blocks` consecutive device blocks starting at `from`,
/// returning the concatenated output
fn render_span(scheduler: &PlaybackScheduler, from: Duration, blocks: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(blocks * BLOCK);
    let mut now = from;
    for _ in 0..blocks {
        let mut block = vec![0.0f32; BLOCK];
        scheduler.render(&mut block, now);
        out.extend(block);
        now += Duration::from_millis(10);
    }
    out
}

#[test]
fn jittered_arrivals_play_out_contiguously() {
    let (scheduler, mut rx) = PlaybackScheduler::new(RATE, JITTER);

    // Three 500ms buffers arriving with network jitter, all before
    // their scheduled slots.
    scheduler.push(chunk(500, 0.1), Duration::ZERO);
    scheduler.push(chunk(500, 0.2), Duration::from_millis(120));
    scheduler.push(chunk(500, 0.3), Duration::from_millis(480));

    // The schedule spans exactly 1500ms from the jitter anchor.
    assert_eq!(
        scheduler.next_start(),
        Some(JITTER + Duration::from_millis(1500))
    );

    // 180 blocks cover 0..1800ms.
    let out = render_span(&scheduler, Duration::ZERO, 180);

    let anchor = 24 * 200; // sample index of the 200ms anchor
    let per_chunk = 12_000;
    assert!(out[..anchor].iter().all(|&s| s == 0.0));
    assert!(out[anchor..anchor + per_chunk].iter().all(|&s| s == 0.1));
    assert!(out[anchor + per_chunk..anchor + 2 * per_chunk]
        .iter()
        .all(|&s| s == 0.2));
    assert!(out[anchor + 2 * per_chunk..anchor + 3 * per_chunk]
        .iter()
        .all(|&s| s == 0.3));
    assert!(out[anchor + 3 * per_chunk..].iter().all(|&s| s == 0.0));

    assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Idle);
    assert!(rx.try_recv().is_err());
}

#[test]
fn barge_in_silences_immediately_and_resyncs() {
    let (scheduler, mut rx) = PlaybackScheduler::new(RATE, JITTER);

    scheduler.push(chunk(500, 0.1), Duration::ZERO);
    scheduler.push(chunk(500, 0.2), Duration::ZERO);

    // Play into the middle of the first buffer.
    let out = render_span(&scheduler, Duration::ZERO, 45);
    assert!(out[out.len() - 1] == 0.1);

    scheduler.flush();
    assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Flushed);
    assert_eq!(scheduler.scheduled_len(), 0);

    // Everything after the flush is silence, with no Idle for the
    // discarded buffers.
    let out = render_span(&scheduler, Duration::from_millis(450), 30);
    assert!(out.iter().all(|&s| s == 0.0));
    assert!(rx.try_recv().is_err());

    // The next turn anchors fresh from its own arrival time.
    let start = scheduler
        .push(chunk(100, 0.5), Duration::from_millis(750))
        .unwrap();
    assert_eq!(start, Duration::from_millis(950));

    let out = render_span(&scheduler, Duration::from_millis(950), 10);
    assert!(out.iter().all(|&s| s == 0.5));
    assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Idle);
}

#[test]
fn underrun_reanchors_the_next_burst() {
    let (scheduler, mut rx) = PlaybackScheduler::new(RATE, JITTER);

    scheduler.push(chunk(100, 0.1), Duration::ZERO);
    let out = render_span(&scheduler, Duration::ZERO, 30);
    assert!(out[..4800].iter().all(|&s| s == 0.0));
    assert!(out[4800..7200].iter().all(|&s| s == 0.1));
    assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Idle);

    // A long silence, then speech resumes: the stale next_start is in
    // the past, so the new buffer re-anchors instead of playing late.
    let start = scheduler
        .push(chunk(100, 0.4), Duration::from_secs(10))
        .unwrap();
    assert_eq!(start, Duration::from_secs(10) + JITTER);

    let out = render_span(&scheduler, start, 10);
    assert!(out.iter().all(|&s| s == 0.4));
}

#[test]
fn speech_span_has_no_gaps_across_buffer_boundaries() {
    let (scheduler, _rx) = PlaybackScheduler::new(RATE, JITTER);

    // Uneven buffer sizes, still ms-aligned.
    scheduler.push(chunk(130, 0.1), Duration::ZERO);
    scheduler.push(chunk(70, 0.1), Duration::ZERO);
    scheduler.push(chunk(250, 0.1), Duration::ZERO);

    let out = render_span(&scheduler, Duration::ZERO, 70);
    let anchor = 24 * 200;
    let speech = 24 * 450;
    // Every sample in the scheduled span is speech; a single zero
    // would be an audible click.
    assert!(out[anchor..anchor + speech].iter().all(|&s| s == 0.1));
    assert!(out[anchor + speech..].iter().all(|&s| s == 0.0));
}
