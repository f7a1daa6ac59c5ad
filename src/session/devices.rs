//! Media device abstraction
//!
//! `cpal` streams are not `Send`, so the system implementation parks
//! each stream on a dedicated thread and hands the session a `Send`
//! handle. Tests substitute fakes to drive the state machine without
//! hardware.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::capture::capture_queue_blocks;
use crate::audio::{AudioCapture, AudioOutput, PlaybackClock, PlaybackScheduler};
use crate::vision::FrameSource;
use crate::{Error, Result};

/// A running capture or output stream; stopping is idempotent
pub trait DeviceHandle: Send {
    /// Stop the stream and release the device
    fn stop(&mut self);
}

/// Hardware access used by the session controller
///
/// The capture and output streams are owned exclusively by the session
/// for its lifetime; nothing else touches the raw device handles.
pub trait MediaDevices: Send + Sync + 'static {
    /// Open the microphone and start streaming sample blocks
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when access is refused
    fn open_microphone(
        &self,
        sample_rate: u32,
    ) -> Result<(Box<dyn DeviceHandle>, mpsc::Receiver<Vec<f32>>)>;

    /// Open the camera collaborator
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when access is refused
    fn open_camera(&self) -> Result<Arc<dyn FrameSource>>;

    /// Open the output device and start rendering from the scheduler
    ///
    /// Returns the stream handle and the device-relative clock the
    /// scheduler must be driven with.
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device is available
    fn open_output(
        &self,
        sample_rate: u32,
        scheduler: Arc<PlaybackScheduler>,
    ) -> Result<(Box<dyn DeviceHandle>, Arc<dyn PlaybackClock>)>;
}

enum StreamCommand {
    Stop,
}

/// Handle to a stream parked on its own thread
struct ThreadedStream {
    commands: Option<std::sync::mpsc::Sender<StreamCommand>>,
}

impl DeviceHandle for ThreadedStream {
    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(StreamCommand::Stop);
        }
    }
}

impl Drop for ThreadedStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Real devices via `cpal`, plus an optional camera collaborator
pub struct SystemDevices {
    camera: Option<Arc<dyn FrameSource>>,
}

impl SystemDevices {
    /// Create with no camera (vision frames will simply not be sent)
    #[must_use]
    pub const fn new() -> Self {
        Self { camera: None }
    }

    /// Create with a camera collaborator
    #[must_use]
    pub fn with_camera(camera: Arc<dyn FrameSource>) -> Self {
        Self {
            camera: Some(camera),
        }
    }
}

impl Default for SystemDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices for SystemDevices {
    fn open_microphone(
        &self,
        sample_rate: u32,
    ) -> Result<(Box<dyn DeviceHandle>, mpsc::Receiver<Vec<f32>>)> {
        let (block_tx, block_rx) = mpsc::channel(capture_queue_blocks());
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let (command_tx, command_rx) = std::sync::mpsc::channel::<StreamCommand>();

        // The cpal stream lives and dies on this thread.
        std::thread::Builder::new()
            .name("voxlink-capture".to_string())
            .spawn(move || {
                let mut capture = match AudioCapture::new(sample_rate) {
                    Ok(capture) => capture,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = capture.start(block_tx) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                let _ = command_rx.recv();
                capture.stop();
            })
            .map_err(|e| Error::Audio(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| Error::Audio("capture thread died during startup".to_string()))??;

        Ok((
            Box::new(ThreadedStream {
                commands: Some(command_tx),
            }),
            block_rx,
        ))
    }

    fn open_camera(&self) -> Result<Arc<dyn FrameSource>> {
        Ok(self.camera.clone().unwrap_or_else(|| Arc::new(NoCamera)))
    }

    fn open_output(
        &self,
        sample_rate: u32,
        scheduler: Arc<PlaybackScheduler>,
    ) -> Result<(Box<dyn DeviceHandle>, Arc<dyn PlaybackClock>)> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<crate::audio::OutputClock>>();
        let (command_tx, command_rx) = std::sync::mpsc::channel::<StreamCommand>();

        std::thread::Builder::new()
            .name("voxlink-output".to_string())
            .spawn(move || {
                let mut output = match AudioOutput::new(sample_rate) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = output.start(scheduler) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(output.clock()));

                let _ = command_rx.recv();
                output.stop();
            })
            .map_err(|e| Error::Audio(e.to_string()))?;

        let clock = ready_rx
            .recv()
            .map_err(|_| Error::Audio("output thread died during startup".to_string()))??;

        Ok((
            Box::new(ThreadedStream {
                commands: Some(command_tx),
            }),
            Arc::new(clock),
        ))
    }
}

/// Camera stand-in that never produces a frame
struct NoCamera;

impl FrameSource for NoCamera {
    fn frame(&self) -> Option<crate::vision::RawFrame> {
        None
    }
}
