//! Timestamp formatting for goal times.

/// Format seconds into `HH:MM:SS`, or `HH:MM:SS.mmm` when fractional.
///
/// # Examples
/// ```
/// use goleador_models::timestamp::format_seconds;
/// assert_eq!(format_seconds(103.0), "00:01:43");
/// assert_eq!(format_seconds(0.5), "00:00:00.500");
/// ```
pub fn format_seconds(total_secs: f64) -> String {
    // Round once so 59.9996 carries into the minute instead of printing 60
    let total_ms = (total_secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    if millis > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}
