//! Clip selection policy.
//!
//! Clips are considered in the order the catalog returned them. The
//! assembler asks [`Selection::consider`] before downloading a clip and
//! calls [`Selection::accept`] once the body is on disk; selection is full
//! as soon as the accepted duration strictly exceeds the target.

use clipreel_models::{Clip, Schedule};

use crate::blacklist::Blacklist;

/// Limits applied while selecting clips.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub target_seconds: u32,
    pub repeat_broadcaster: bool,
    pub clip_time_max: Option<u32>,
}

impl SelectionPolicy {
    pub fn new(target_seconds: u32) -> Self {
        Self {
            target_seconds,
            repeat_broadcaster: true,
            clip_time_max: None,
        }
    }

    pub fn for_schedule(schedule: &Schedule) -> Self {
        Self {
            target_seconds: schedule.target_duration_seconds,
            repeat_broadcaster: schedule.repeat_broadcaster,
            clip_time_max: schedule.clip_time_max_seconds,
        }
    }
}

/// Why a clip was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blacklisted,
    TooLong,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Blacklisted => "blacklisted",
            SkipReason::TooLong => "too_long",
        }
    }
}

/// Outcome of considering one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Take,
    Skip(SkipReason),
}

/// Selection state for one compile.
///
/// Owns the working blacklist, a copy of the global list that the
/// no-repeat policy extends.
#[derive(Debug)]
pub struct Selection {
    policy: SelectionPolicy,
    blacklist: Blacklist,
    accumulated: u32,
    selected: Vec<Clip>,
}

impl Selection {
    pub fn new(policy: SelectionPolicy, global: &Blacklist) -> Self {
        Self {
            policy,
            blacklist: global.clone(),
            accumulated: 0,
            selected: Vec::new(),
        }
    }

    /// Decide whether to fetch `clip`.
    ///
    /// Under the no-repeat policy a taken clip claims its broadcaster
    /// immediately, before its download is attempted, so a failed download
    /// still excludes later clips from the same broadcaster.
    pub fn consider(&mut self, clip: &Clip) -> Verdict {
        if self.blacklist.contains(&clip.broadcaster.name) {
            return Verdict::Skip(SkipReason::Blacklisted);
        }
        if let Some(max) = self.policy.clip_time_max {
            if clip.duration > max {
                return Verdict::Skip(SkipReason::TooLong);
            }
        }
        if !self.policy.repeat_broadcaster {
            self.blacklist.insert(clip.broadcaster.name.clone());
        }
        Verdict::Take
    }

    /// Record a clip whose body was fetched.
    pub fn accept(&mut self, clip: Clip) {
        self.accumulated = self.accumulated.saturating_add(clip.duration);
        self.selected.push(clip);
    }

    pub fn is_full(&self) -> bool {
        self.accumulated > self.policy.target_seconds
    }

    pub fn accumulated(&self) -> u32 {
        self.accumulated
    }

    pub fn selected(&self) -> &[Clip] {
        &self.selected
    }

    pub fn into_selected(self) -> Vec<Clip> {
        self.selected
    }
}

/// Run selection without downloads, as if every fetch succeeded.
pub fn select_clips(policy: SelectionPolicy, global: &Blacklist, clips: &[Clip]) -> Vec<Clip> {
    let mut selection = Selection::new(policy, global);
    for clip in clips {
        if selection.consider(clip) == Verdict::Take {
            selection.accept(clip.clone());
            if selection.is_full() {
                break;
            }
        }
    }
    selection.into_selected()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone, Utc};
    use clipreel_models::{Clip, SourceVersion, User};

    pub fn clip(id: &str, broadcaster: &str, duration: u32) -> Clip {
        let base = Utc.with_ymd_and_hms(2024, 1, 3, 18, 0, 0).unwrap();
        Clip {
            id: id.to_string(),
            url: format!("https://clips.example/{id}"),
            broadcaster: User::new(format!("id-{broadcaster}"), broadcaster),
            clipper: User::new("c", "clipper"),
            video_id: String::new(),
            game_id: "33214".to_string(),
            language: "en".to_string(),
            title: format!("clip {id}"),
            view_count: 100,
            created_at: base + Duration::minutes(id.len() as i64),
            duration,
            thumbnail_url: format!("https://clips.example/{id}-preview-480x272.jpg"),
            video_url: Some(format!("https://clips.example/{id}.mp4")),
            source_version: SourceVersion::V1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::clip;
    use super::*;

    #[test]
    fn test_stops_once_target_exceeded() {
        let clips = vec![clip("a", "x", 20), clip("b", "y", 20), clip("c", "z", 20)];
        let selected = select_clips(SelectionPolicy::new(30), &Blacklist::new(), &clips);
        let ids: Vec<_> = selected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_equal_to_target_keeps_going() {
        let clips = vec![clip("a", "x", 15), clip("b", "y", 15), clip("c", "z", 1)];
        let selected = select_clips(SelectionPolicy::new(30), &Blacklist::new(), &clips);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_catalog_fractions_truncated_before_tally() {
        // 30.5 s from the catalog counts as 30, which does not exceed 30
        let clips = vec![
            clip("a", "x", clipreel_catalog::types::whole_seconds(30.5)),
            clip("b", "y", clipreel_catalog::types::whole_seconds(10.2)),
        ];
        let selected = select_clips(SelectionPolicy::new(30), &Blacklist::new(), &clips);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_no_repeat_skips_second_clip_from_broadcaster() {
        let clips = vec![clip("a1", "A", 10), clip("a2", "A", 10), clip("b1", "B", 10)];
        let mut policy = SelectionPolicy::new(600);
        policy.repeat_broadcaster = false;

        let selected = select_clips(policy, &Blacklist::new(), &clips);
        let ids: Vec<_> = selected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b1"]);
    }

    #[test]
    fn test_repeats_allowed_by_default() {
        let clips = vec![clip("a1", "A", 10), clip("a2", "A", 10)];
        let selected = select_clips(SelectionPolicy::new(600), &Blacklist::new(), &clips);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_global_blacklist_and_max_duration() {
        let clips = vec![clip("a", "banned", 10), clip("b", "ok", 90), clip("c", "ok", 30)];
        let mut policy = SelectionPolicy::new(600);
        policy.clip_time_max = Some(60);
        let global: Blacklist = ["banned"].into_iter().collect();

        let mut selection = Selection::new(policy, &global);
        assert_eq!(selection.consider(&clips[0]), Verdict::Skip(SkipReason::Blacklisted));
        assert_eq!(selection.consider(&clips[1]), Verdict::Skip(SkipReason::TooLong));
        assert_eq!(selection.consider(&clips[2]), Verdict::Take);
    }

    #[test]
    fn test_claim_happens_before_accept() {
        let mut policy = SelectionPolicy::new(600);
        policy.repeat_broadcaster = false;
        let mut selection = Selection::new(policy, &Blacklist::new());

        // First clip taken but never accepted, as when its download fails.
        assert_eq!(selection.consider(&clip("a1", "A", 10)), Verdict::Take);
        assert_eq!(
            selection.consider(&clip("a2", "A", 10)),
            Verdict::Skip(SkipReason::Blacklisted)
        );
        assert!(selection.selected().is_empty());
        assert_eq!(selection.accumulated(), 0);
    }
}
