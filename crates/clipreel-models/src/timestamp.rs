//! Chapter timestamp formatting for compilation descriptions.

/// Format a cumulative offset in seconds as `MM:SS`.
///
/// Minutes are not wrapped into hours.
///
/// # Examples
/// ```
/// use clipreel_models::timestamp::format_chapter_timestamp;
/// assert_eq!(format_chapter_timestamp(0), "00:00");
/// assert_eq!(format_chapter_timestamp(75), "01:15");
/// assert_eq!(format_chapter_timestamp(3725), "62:05");
/// ```
pub fn format_chapter_timestamp(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_chapter_timestamp() {
        assert_eq!(format_chapter_timestamp(0), "00:00");
        assert_eq!(format_chapter_timestamp(9), "00:09");
        assert_eq!(format_chapter_timestamp(60), "01:00");
        assert_eq!(format_chapter_timestamp(599), "09:59");
    }

    #[test]
    fn test_minutes_not_wrapped() {
        assert_eq!(format_chapter_timestamp(7200), "120:00");
    }
}
