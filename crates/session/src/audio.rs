use std::fmt::{Display, Formatter};

use tracing::debug;

/// Errors raised by an audio input/output graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioIoError {
    DeviceUnavailable(String),
    Backend {
        context: &'static str,
        message: String,
    },
}

impl Display for AudioIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceUnavailable(device) => write!(f, "audio device unavailable: {device}"),
            Self::Backend { context, message } => write!(f, "{context}: {message}"),
        }
    }
}

impl std::error::Error for AudioIoError {}

/// Start/stop surface of the microphone-to-speaker monitoring graph.
pub trait AudioIo {
    fn start(&mut self) -> Result<(), AudioIoError>;

    /// Stops the graph. Never fails; stopping a stopped graph is a no-op.
    fn stop(&mut self);
}

/// Audio graph that only records whether it would be running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullAudioIo {
    running: bool,
}

impl NullAudioIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl AudioIo for NullAudioIo {
    fn start(&mut self) -> Result<(), AudioIoError> {
        self.running = true;
        debug!("null audio graph started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        debug!("null audio graph stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioIo, AudioIoError, NullAudioIo};

    #[test]
    fn null_audio_tracks_running_state() {
        let mut audio = NullAudioIo::new();
        audio.start().expect("null audio always starts");
        assert!(audio.is_running());
        audio.stop();
        assert!(!audio.is_running());
    }

    #[test]
    fn backend_error_message_includes_context() {
        let error = AudioIoError::Backend {
            context: "connect input to output",
            message: "format mismatch".to_owned(),
        };
        assert_eq!(error.to_string(), "connect input to output: format mismatch");
    }
}
