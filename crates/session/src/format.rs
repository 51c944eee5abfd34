/// Formats seconds as `m:ss`, e.g. `65.0` as `1:05`.
///
/// Fractions are truncated. Minutes are not wrapped at the hour, so a
/// 61-minute position reads `61:00`. Negative and non-finite inputs read
/// `0:00`.
///
/// # Example
/// ```
/// use session::format_playback_time;
///
/// assert_eq!(format_playback_time(65.0), "1:05");
/// assert_eq!(format_playback_time(9.99), "0:09");
/// ```
pub fn format_playback_time(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}
