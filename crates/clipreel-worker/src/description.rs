//! Compilation title and chapter description.

use chrono::{DateTime, Utc};

use clipreel_models::{format_chapter_timestamp, Clip};

/// `Top <game> Twitch Clips MM/DD/YY - MM/DD/YY`.
pub fn compilation_title(game_name: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "Top {} Twitch Clips {} - {}",
        game_name,
        start.format("%m/%d/%y"),
        end.format("%m/%d/%y")
    )
}

/// One `<title> <broadcaster> (MM:SS)` line per clip.
///
/// Each timestamp is the sum of the original durations of the clips before
/// it, so chapters line up with the concatenated artifact.
pub fn chapter_description(clips: &[Clip]) -> String {
    let mut description = String::new();
    let mut offset: u32 = 0;
    for clip in clips {
        description.push_str(&format!(
            "{} {} ({})\n",
            clip.title,
            clip.broadcaster.name,
            format_chapter_timestamp(offset)
        ));
        offset = offset.saturating_add(clip.duration);
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::fixtures::clip;
    use chrono::TimeZone;

    #[test]
    fn test_title() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap();
        assert_eq!(
            compilation_title("Fortnite", start, end),
            "Top Fortnite Twitch Clips 01/01/24 - 01/07/24"
        );
    }

    #[test]
    fn test_chapters_use_cumulative_original_durations() {
        let clips = vec![clip("a", "alpha", 45), clip("b", "beta", 30), clip("c", "gamma", 12)];
        let description = chapter_description(&clips);
        let lines: Vec<_> = description.lines().collect();

        assert_eq!(
            lines,
            vec![
                "clip a alpha (00:00)",
                "clip b beta (00:45)",
                "clip c gamma (01:15)",
            ]
        );
        assert!(description.ends_with('\n'));
    }

    #[test]
    fn test_chapters_sum_truncated_seconds() {
        let clips: Vec<_> = [("a", 27.6), ("b", 27.6), ("c", 10.0)]
            .into_iter()
            .map(|(id, secs)| clip(id, "x", clipreel_catalog::types::whole_seconds(secs)))
            .collect();
        let description = chapter_description(&clips);
        let lines: Vec<_> = description.lines().collect();
        assert_eq!(lines[1], "clip b x (00:27)");
        assert_eq!(lines[2], "clip c x (00:54)");
    }

    #[test]
    fn test_chapters_monotonic() {
        let clips: Vec<_> = (0..30).map(|i| clip(&format!("c{i}"), "x", 29)).collect();
        let stamps: Vec<String> = chapter_description(&clips)
            .lines()
            .map(|l| l.rsplit('(').next().unwrap().trim_end_matches(')').to_string())
            .collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(chapter_description(&[]), "");
    }
}
