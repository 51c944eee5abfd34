use crate::error::{Result, TimelineError};

/// Converts an absolute seek in seconds to normalized progress in `0..=1`.
///
/// Non-finite seeks map to `0.0`; seeks outside the song are clamped.
///
/// # Example
/// ```
/// use timeline::seek_to_progress;
///
/// assert_eq!(seek_to_progress(30.0, 120.0), 0.25);
/// assert_eq!(seek_to_progress(500.0, 120.0), 1.0);
/// ```
pub fn seek_to_progress(seek: f64, duration: f64) -> f64 {
    if !seek.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    (seek / duration).clamp(0.0, 1.0)
}

/// Converts normalized progress back to an absolute seek in seconds.
pub fn progress_to_seek(progress: f64, duration: f64) -> f64 {
    normalize_seek(progress * duration, duration)
}

/// Clamps `seek` into `0..=duration`, treating non-finite values as zero.
pub fn normalize_seek(seek: f64, duration: f64) -> f64 {
    if !seek.is_finite() {
        return 0.0;
    }
    seek.clamp(0.0, duration.max(0.0))
}

/// Validates a progress value received as a command argument.
pub fn validate_progress(progress: f64) -> Result<f64> {
    if progress.is_finite() && (0.0..=1.0).contains(&progress) {
        Ok(progress)
    } else {
        Err(TimelineError::InvalidProgress(progress))
    }
}

/// Validates a tempo factor; `1.0` is the original tempo.
pub fn validate_tempo(factor: f64) -> Result<f64> {
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(TimelineError::InvalidTempo(factor))
    }
}
