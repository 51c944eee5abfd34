use serde::Deserialize;

/// Default distance of the "retry" rewind, in seconds.
pub const DEFAULT_RETRY_SECONDS: u32 = 5;

/// Per-session settings supplied by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub retry_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_seconds: DEFAULT_RETRY_SECONDS,
        }
    }
}
