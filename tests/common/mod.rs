//! Shared fakes for session tests: an in-process live channel and
//! hardware-free media devices.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use voxlink::audio::playback::{PlaybackClock, PlaybackScheduler};
use voxlink::link::{LinkEvent, LinkSink, LiveChannel, LiveConnector, ToolCallResponse};
use voxlink::session::devices::{DeviceHandle, MediaDevices};
use voxlink::session::{SessionStatus, SessionUpdate};
use voxlink::vision::{FrameSource, RawFrame};
use voxlink::{Error, Result};

/// Everything the session sent outbound
#[derive(Default)]
pub struct SentLog {
    pub audio: Vec<Vec<u8>>,
    pub images: Vec<Vec<u8>>,
    pub tool_responses: Vec<ToolCallResponse>,
}

pub struct FakeSink {
    pub log: Arc<Mutex<SentLog>>,
}

#[async_trait]
impl LinkSink for FakeSink {
    async fn send_audio(&self, pcm: Vec<u8>) -> Result<()> {
        self.log.lock().unwrap().audio.push(pcm);
        Ok(())
    }

    async fn send_image(&self, jpeg: Vec<u8>) -> Result<()> {
        self.log.lock().unwrap().images.push(jpeg);
        Ok(())
    }

    async fn send_tool_response(&self, response: ToolCallResponse) -> Result<()> {
        self.log.lock().unwrap().tool_responses.push(response);
        Ok(())
    }
}

/// In-process connector; the test keeps the event sender
pub struct FakeConnector {
    pub fail: bool,
    pub log: Arc<Mutex<SentLog>>,
    events: Mutex<Option<mpsc::Receiver<LinkEvent>>>,
}

impl FakeConnector {
    pub fn new() -> (Self, mpsc::Sender<LinkEvent>, Arc<Mutex<SentLog>>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let log = Arc::new(Mutex::new(SentLog::default()));
        (
            Self {
                fail: false,
                log: Arc::clone(&log),
                events: Mutex::new(Some(event_rx)),
            },
            event_tx,
            log,
        )
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            log: Arc::new(Mutex::new(SentLog::default())),
            events: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LiveConnector for FakeConnector {
    async fn connect(&self) -> Result<LiveChannel> {
        if self.fail {
            return Err(Error::ChannelOpen("endpoint unreachable".to_string()));
        }
        let events = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::ChannelOpen("already connected".to_string()))?;
        Ok(LiveChannel {
            sink: Box::new(FakeSink {
                log: Arc::clone(&self.log),
            }),
            events,
        })
    }
}

/// Manually advanced device clock
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl PlaybackClock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

struct NoopHandle;

impl DeviceHandle for NoopHandle {
    fn stop(&mut self) {}
}

/// Camera producing a solid-color frame
pub struct TestCamera;

impl FrameSource for TestCamera {
    fn frame(&self) -> Option<RawFrame> {
        Some(RawFrame {
            width: 64,
            height: 48,
            rgb: vec![200; 64 * 48 * 3],
        })
    }
}

/// Pieces of the fake hardware the test can reach after connect
#[derive(Default)]
pub struct DeviceState {
    pub scheduler: Option<Arc<PlaybackScheduler>>,
    pub block_tx: Option<mpsc::Sender<Vec<f32>>>,
}

pub struct FakeDevices {
    pub mic_fail: bool,
    pub clock: ManualClock,
    pub state: Arc<Mutex<DeviceState>>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self {
            mic_fail: false,
            clock: ManualClock::default(),
            state: Arc::new(Mutex::new(DeviceState::default())),
        }
    }

    pub fn without_microphone() -> Self {
        Self {
            mic_fail: true,
            ..Self::new()
        }
    }
}

impl MediaDevices for FakeDevices {
    fn open_microphone(
        &self,
        _sample_rate: u32,
    ) -> Result<(Box<dyn DeviceHandle>, mpsc::Receiver<Vec<f32>>)> {
        if self.mic_fail {
            return Err(Error::PermissionDenied("microphone access denied".to_string()));
        }
        let (tx, rx) = mpsc::channel(32);
        self.state.lock().unwrap().block_tx = Some(tx);
        Ok((Box::new(NoopHandle), rx))
    }

    fn open_camera(&self) -> Result<Arc<dyn FrameSource>> {
        Ok(Arc::new(TestCamera))
    }

    fn open_output(
        &self,
        _sample_rate: u32,
        scheduler: Arc<PlaybackScheduler>,
    ) -> Result<(Box<dyn DeviceHandle>, Arc<dyn PlaybackClock>)> {
        self.state.lock().unwrap().scheduler = Some(scheduler);
        Ok((Box::new(NoopHandle), Arc::new(self.clock.clone())))
    }
}

/// Wait for the next status update, skipping other telemetry
pub async fn next_status(updates: &mut mpsc::UnboundedReceiver<SessionUpdate>) -> SessionStatus {
    loop {
        let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("timed out waiting for status update")
            .expect("update stream closed");
        if let SessionUpdate::Status(status) = update {
            return status;
        }
    }
}

/// Wait until a predicate matches an update, skipping the rest
pub async fn wait_for<F>(updates: &mut mpsc::UnboundedReceiver<SessionUpdate>, mut matches: F)
where
    F: FnMut(&SessionUpdate) -> bool,
{
    loop {
        let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("timed out waiting for update")
            .expect("update stream closed");
        if matches(&update) {
            return;
        }
    }
}
