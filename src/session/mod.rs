//! Session controller
//!
//! Owns the voice link end to end: device acquisition, the live
//! channel, the capture pipeline, jitter-buffered playback, vision
//! sampling, transcription, and tool dispatch. Inbound channel events
//! are consumed by a single ordered task so turn boundaries and
//! interruptions can never be observed out of order.

pub mod devices;
pub mod status;

pub use devices::{DeviceHandle, MediaDevices, SystemDevices};
pub use status::{SessionStatus, SessionUpdate};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::playback::{PlaybackClock, PlaybackEvent, PlaybackScheduler};
use crate::audio::codec;
use crate::config::SessionConfig;
use crate::link::{LinkEvent, LinkSink, LiveConnector};
use crate::tools::{DispatchedTool, MediaForge, PresentationOverlay, ToolDispatcher};
use crate::transcript::{Role, TranscriptAggregator};
use crate::vision::{FrameSource, VisionSampler};
use crate::{Error, Result};

/// Control commands accepted by a running session
#[derive(Debug)]
enum Command {
    SetMuted(bool),
    SetVision(bool),
    Disconnect,
}

/// Whether the run loop keeps going after an event
enum Flow {
    Continue,
    /// Tear down, optionally surfacing a terminal reason
    Stop(Option<String>),
}

/// Handle to a running session
///
/// Dropping the handle disconnects the session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<Result<()>>,
}

impl SessionHandle {
    /// Gate outbound audio; capture keeps running while muted
    pub fn set_muted(&self, muted: bool) {
        let _ = self.commands.send(Command::SetMuted(muted));
    }

    /// Enable or disable the vision channel
    pub fn set_vision(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetVision(enabled));
    }

    /// Disconnect the session
    ///
    /// Safe to call from any state, including mid-connect, and safe to
    /// call more than once; only the first call has any effect.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Wait for the session task to finish
    ///
    /// # Errors
    ///
    /// Returns the connect-time error if establishing the session
    /// failed (permission denied, channel open failure)
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Channel(format!("session task panicked: {e}"))),
        }
    }
}

/// Top-level state machine orchestrating the duplex media session
pub struct SessionController<C, D> {
    config: SessionConfig,
    connector: C,
    devices: D,
    presentation: Arc<dyn PresentationOverlay>,
    forge: Arc<dyn MediaForge>,
}

impl<C, D> SessionController<C, D>
where
    C: LiveConnector + 'static,
    D: MediaDevices,
{
    /// Create a controller over the given collaborators
    pub fn new(
        config: SessionConfig,
        connector: C,
        devices: D,
        presentation: Arc<dyn PresentationOverlay>,
        forge: Arc<dyn MediaForge>,
    ) -> Self {
        Self {
            config,
            connector,
            devices,
            presentation,
            forge,
        }
    }

    /// Start connecting and return the session handle and telemetry
    ///
    /// The connect attempt runs on the session task; its outcome is
    /// observable through the updates stream and [`SessionHandle::join`].
    #[must_use]
    pub fn start(self) -> (SessionHandle, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(command_rx, update_tx));

        (
            SessionHandle {
                commands: command_tx,
                task,
            },
            update_rx,
        )
    }

    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Result<()> {
        let _ = updates.send(SessionUpdate::Status(SessionStatus::Connecting));

        // Device acquisition is quick; the channel open is the long
        // pole and stays cancellable by an early disconnect.
        let established = {
            let connect = self.establish(updates.clone());
            tokio::pin!(connect);
            loop {
                tokio::select! {
                    result = &mut connect => break result,
                    cmd = commands.recv() => match cmd {
                        Some(Command::Disconnect) | None => {
                            tracing::info!("connect attempt cancelled");
                            let _ = updates.send(SessionUpdate::Status(SessionStatus::Disconnected));
                            return Ok(());
                        }
                        Some(other) => {
                            tracing::debug!(command = ?other, "command ignored during connect");
                        }
                    },
                }
            }
        };

        let (mut active, mut events, mut capture_rx, mut playback_rx) = match established {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(error = %e, "connect failed");
                let _ = updates.send(SessionUpdate::LinkFailed(e.to_string()));
                let _ = updates.send(SessionUpdate::Status(SessionStatus::Disconnected));
                return Err(e);
            }
        };
        active.set_status(SessionStatus::Listening);
        tracing::info!("voice link established");

        let mut capture_open = true;
        let mut terminal = None;

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::SetMuted(muted)) => active.set_muted(muted),
                    Some(Command::SetVision(enabled)) => active.sampler.set_enabled(enabled),
                    Some(Command::Disconnect) | None => break,
                },
                event = events.recv() => match event {
                    Some(event) => match active.handle_event(event).await {
                        Flow::Continue => {}
                        Flow::Stop(reason) => {
                            terminal = reason;
                            break;
                        }
                    },
                    None => {
                        terminal = Some("channel closed".to_string());
                        break;
                    }
                },
                block = capture_rx.recv(), if capture_open => match block {
                    Some(block) => match active.handle_capture(&block).await {
                        Flow::Continue => {}
                        Flow::Stop(reason) => {
                            terminal = reason;
                            break;
                        }
                    },
                    None => capture_open = false,
                },
                playback = playback_rx.recv() => {
                    if let Some(event) = playback {
                        active.handle_playback(event);
                    }
                },
            }
        }

        active.teardown(terminal);
        Ok(())
    }

    /// Acquire devices and open the channel
    async fn establish(
        &self,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Result<(
        Active,
        mpsc::Receiver<LinkEvent>,
        mpsc::Receiver<Vec<f32>>,
        mpsc::UnboundedReceiver<PlaybackEvent>,
    )> {
        let (mic, capture_rx) = self
            .devices
            .open_microphone(self.config.input_sample_rate)?;
        let camera = self.devices.open_camera()?;

        let (scheduler, playback_rx) = PlaybackScheduler::new(
            self.config.output_sample_rate,
            self.config.jitter_latency(),
        );
        let scheduler = Arc::new(scheduler);
        let (speaker, clock) = self
            .devices
            .open_output(self.config.output_sample_rate, Arc::clone(&scheduler))?;

        let channel = self.connector.connect().await?;

        Ok((
            Active {
                sink: channel.sink,
                mic,
                speaker,
                scheduler,
                clock,
                camera,
                sampler: VisionSampler::new(&self.config),
                transcripts: TranscriptAggregator::new(),
                dispatcher: ToolDispatcher::new(
                    Arc::clone(&self.presentation),
                    Arc::clone(&self.forge),
                ),
                output_sample_rate: self.config.output_sample_rate,
                status: SessionStatus::Connecting,
                muted: false,
                turn: 0,
                updates,
            },
            channel.events,
            capture_rx,
            playback_rx,
        ))
    }
}

/// State of an established session, owned by the run loop
struct Active {
    sink: Box<dyn LinkSink>,
    mic: Box<dyn DeviceHandle>,
    speaker: Box<dyn DeviceHandle>,
    scheduler: Arc<PlaybackScheduler>,
    clock: Arc<dyn PlaybackClock>,
    camera: Arc<dyn FrameSource>,
    sampler: VisionSampler,
    transcripts: TranscriptAggregator,
    dispatcher: ToolDispatcher,
    output_sample_rate: u32,
    status: SessionStatus,
    muted: bool,
    turn: u64,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl Active {
    fn publish(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "status change");
            self.status = status;
            self.publish(SessionUpdate::Status(status));
        }
    }

    const fn resting_status(&self) -> SessionStatus {
        if self.muted {
            SessionStatus::Idle
        } else {
            SessionStatus::Listening
        }
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        tracing::debug!(muted, "mute toggled");
        // Mute never changes connection state; it only gates
        // transmission and the resting status label.
        if matches!(self.status, SessionStatus::Listening | SessionStatus::Idle) {
            let resting = self.resting_status();
            self.set_status(resting);
        }
    }

    async fn handle_capture(&mut self, block: &[f32]) -> Flow {
        self.publish(SessionUpdate::AudioLevel(codec::rms(block)));
        if self.muted {
            // Captured and discarded locally; the stream keeps running
            // so unmuting has no restart cost.
            return Flow::Continue;
        }
        if let Err(e) = self.sink.send_audio(codec::encode_pcm16(block)).await {
            tracing::error!(error = %e, "failed to send audio");
            return Flow::Stop(Some(e.to_string()));
        }
        Flow::Continue
    }

    async fn handle_event(&mut self, event: LinkEvent) -> Flow {
        match event {
            LinkEvent::AudioChunk(bytes) => self.handle_audio_chunk(&bytes),
            LinkEvent::InputTranscript(delta) => {
                let line = self.transcripts.push(Role::User, &delta);
                self.publish(SessionUpdate::Transcript(line));
            }
            LinkEvent::OutputTranscript(delta) => {
                let line = self.transcripts.push(Role::Assistant, &delta);
                self.publish(SessionUpdate::Transcript(line));
            }
            LinkEvent::TurnStarted => return self.handle_turn_started().await,
            LinkEvent::TurnComplete => {
                tracing::debug!(turn = self.turn, "turn complete");
                self.transcripts.turn_complete();
                self.sampler.reset_turn();
                if matches!(
                    self.status,
                    SessionStatus::Thinking
                        | SessionStatus::Researching
                        | SessionStatus::Presenting
                        | SessionStatus::Forging
                ) {
                    let resting = self.resting_status();
                    self.set_status(resting);
                }
            }
            LinkEvent::Interrupted => self.handle_interrupted(),
            LinkEvent::ToolCall(request) => return self.handle_tool_call(&request).await,
            LinkEvent::Grounding(sources) => {
                if !sources.is_empty() {
                    self.set_status(SessionStatus::Researching);
                    self.publish(SessionUpdate::Grounding(sources));
                }
            }
            LinkEvent::Closed(reason) => {
                tracing::warn!(reason = %reason, "channel closed");
                return Flow::Stop(Some(reason));
            }
            LinkEvent::Error(reason) => {
                tracing::error!(reason = %reason, "channel error");
                return Flow::Stop(Some(reason));
            }
        }
        Flow::Continue
    }

    fn handle_audio_chunk(&mut self, bytes: &[u8]) {
        let frame = match codec::decode_frame(bytes, self.output_sample_rate, 1) {
            Ok(frame) => frame,
            Err(e) => {
                // A single bad buffer is dropped; it must not kill the
                // audio graph.
                tracing::warn!(error = %e, len = bytes.len(), "dropping malformed audio chunk");
                return;
            }
        };
        tracing::trace!(
            frames = frame.frame_count(),
            duration = ?frame.duration(),
            "audio chunk received"
        );
        let samples = frame.channel_f32(0);
        self.publish(SessionUpdate::AudioLevel(codec::rms(&samples)));
        // An empty payload schedules nothing; without an item there is
        // no idle report to ever leave Speaking again.
        if self.scheduler.push(samples, self.clock.now()).is_some() {
            self.set_status(SessionStatus::Speaking);
        }
    }

    async fn handle_turn_started(&mut self) -> Flow {
        self.turn += 1;
        tracing::debug!(turn = self.turn, "turn started");
        // Sources cite the turn that produced them.
        self.publish(SessionUpdate::Grounding(Vec::new()));
        if self.status == SessionStatus::Listening {
            self.set_status(SessionStatus::Thinking);
        }

        if self.sampler.should_capture(self.status) {
            match self.sampler.capture(self.camera.as_ref()) {
                Ok(Some(jpeg)) => {
                    if let Err(e) = self.sink.send_image(jpeg).await {
                        tracing::error!(error = %e, "failed to send vision frame");
                        return Flow::Stop(Some(e.to_string()));
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "vision capture failed"),
            }
        }
        Flow::Continue
    }

    fn handle_interrupted(&mut self) {
        tracing::debug!(turn = self.turn, "barge-in, flushing playback");
        self.scheduler.flush();
        let blanked = self.transcripts.interrupt();
        self.publish(SessionUpdate::Transcript(blanked));
        self.publish(SessionUpdate::Grounding(Vec::new()));
        self.sampler.reset_turn();
        self.set_status(SessionStatus::Listening);
    }

    async fn handle_tool_call(&mut self, request: &crate::link::ToolCallRequest) -> Flow {
        let Some(dispatch) = self.dispatcher.dispatch(request) else {
            return Flow::Continue;
        };
        if let Err(e) = self.sink.send_tool_response(dispatch.response).await {
            tracing::error!(error = %e, "failed to send tool response");
            return Flow::Stop(Some(e.to_string()));
        }
        match dispatch.initiated {
            Some(DispatchedTool::Presentation) => self.set_status(SessionStatus::Presenting),
            Some(DispatchedTool::Forge(_)) => self.set_status(SessionStatus::Forging),
            None => {}
        }
        Flow::Continue
    }

    fn handle_playback(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Idle => {
                // An idle report can cross paths with a buffer scheduled
                // right after it; only an empty queue ends the utterance.
                if self.status == SessionStatus::Speaking && self.scheduler.scheduled_len() == 0 {
                    let resting = self.resting_status();
                    self.set_status(resting);
                }
            }
            // Status is handled where the flush originates.
            PlaybackEvent::Flushed => {}
        }
    }

    fn teardown(&mut self, terminal: Option<String>) {
        self.mic.stop();
        self.speaker.stop();
        self.scheduler.flush();
        self.publish(SessionUpdate::Transcript(String::new()));
        self.publish(SessionUpdate::Grounding(Vec::new()));
        if let Some(reason) = terminal {
            self.publish(SessionUpdate::Terminated(reason));
        }
        self.set_status(SessionStatus::Disconnected);
        tracing::info!("session ended");
    }
}
