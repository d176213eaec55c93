//! Spoken instruction capture.
//!
//! [`AudioInstructionCapture`] is a two-state machine (`Idle` / `Recording`)
//! around a [`Microphone`]. Stopping a recording yields one [`AudioBlob`]
//! ready to be attached to the next improvement request.

use std::fmt;

pub mod wav;

#[cfg(feature = "microphone")]
pub mod microphone;

#[cfg(feature = "microphone")]
pub use microphone::CpalMicrophone;

/// A finished recording in a transportable container
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioBlob {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBlob")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Errors that can occur while opening or finishing a recording
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("microphone access was denied or no input device is available: {0}")]
    PermissionDenied(String),

    #[error("microphone capture is not available in this build")]
    Unsupported,

    #[error("recording failed: {0}")]
    Stream(String),
}

/// An input device that can be opened for one recording session
pub trait Microphone {
    fn open(&mut self) -> Result<Box<dyn Recording>, CaptureError>;
}

/// An in-progress recording. Finishing it releases the device.
pub trait Recording {
    fn finish(self: Box<Self>) -> Result<AudioBlob, CaptureError>;
}

/// Capture state as observed by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

/// What a toggle did
#[derive(Debug, PartialEq, Eq)]
pub enum Toggle {
    Started,
    Stopped(AudioBlob),
}

pub struct AudioInstructionCapture<M: Microphone> {
    microphone: M,
    active: Option<Box<dyn Recording>>,
}

impl<M: Microphone> AudioInstructionCapture<M> {
    pub fn new(microphone: M) -> Self {
        Self {
            microphone,
            active: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        if self.active.is_some() {
            CaptureState::Recording
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begin recording. A second start while recording does nothing.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            tracing::debug!("Recording already in progress");
            return Ok(());
        }

        let recording = self.microphone.open()?;
        self.active = Some(recording);
        tracing::info!("Recording spoken instruction");
        Ok(())
    }

    /// Finish the active recording. Returns `None` when idle.
    pub fn stop(&mut self) -> Result<Option<AudioBlob>, CaptureError> {
        let Some(recording) = self.active.take() else {
            return Ok(None);
        };

        let blob = recording.finish()?;
        tracing::info!("Recorded {} bytes of {}", blob.len(), blob.mime_type);
        Ok(Some(blob))
    }

    pub fn toggle(&mut self) -> Result<Toggle, CaptureError> {
        if self.is_recording() {
            match self.stop()? {
                Some(blob) => Ok(Toggle::Stopped(blob)),
                None => Err(CaptureError::Stream("recording ended unexpectedly".into())),
            }
        } else {
            self.start()?;
            Ok(Toggle::Started)
        }
    }
}

/// Microphone used when the crate is built without native capture
pub struct UnavailableMicrophone;

impl Microphone for UnavailableMicrophone {
    fn open(&mut self) -> Result<Box<dyn Recording>, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}
