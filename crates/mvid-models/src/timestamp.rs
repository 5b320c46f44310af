//! Timestamp formatting used in prompts and logs.

/// Format seconds with two decimals, as shown to the text generator.
///
/// Non-finite values render as `0.00`.
///
/// # Examples
/// ```
/// use mvid_models::timestamp::format_seconds;
/// assert_eq!(format_seconds(4.0), "4.00");
/// assert_eq!(format_seconds(9.256), "9.26");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    if seconds.is_finite() {
        format!("{:.2}", seconds)
    } else {
        "0.00".to_string()
    }
}

/// Format a `[start-end]` range label.
///
/// # Examples
/// ```
/// use mvid_models::timestamp::format_range;
/// assert_eq!(format_range(0.0, 4.5), "[0.00-4.50]");
/// ```
pub fn format_range(start: f64, end: f64) -> String {
    format!("[{}-{}]", format_seconds(start), format_seconds(end))
}

/// Format seconds as `MM:SS.mmm` for human-readable logs.
pub fn format_clock(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00.000");
        assert_eq!(format_clock(75.5), "01:15.500");
        assert_eq!(format_clock(-3.0), "00:00.000");
    }

    #[test]
    fn test_format_seconds_nan() {
        assert_eq!(format_seconds(f64::NAN), "0.00");
    }
}
