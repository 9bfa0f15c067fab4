//! crates/convaudit_core/src/evaluate.rs
//!
//! The participation evaluator: the precise second stage of the pipeline's
//! coarse-search/exact-verify design.
//!
//! Discovery matches conversations where the admin appears in the
//! teammate/assignment set, which says nothing about whether they ever
//! authored a reply. This module inspects the actual message parts and only
//! counts ones the admin wrote inside the window.

use crate::domain::{Conversation, Participation, SearchWindow};

/// Timestamps at or above this value are taken to be milliseconds.
/// 10^10 seconds is the year 2286, far past any real payload.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Normalizes an upstream epoch timestamp to whole seconds.
///
/// Upstream emits seconds in most places and milliseconds in a few; values
/// below [`MILLIS_THRESHOLD`] are already seconds, larger ones are divided
/// by 1000.
pub fn normalize_epoch_seconds(ts: i64) -> i64 {
    if ts >= MILLIS_THRESHOLD {
        ts / 1000
    } else {
        ts
    }
}

/// Counts the parts of `conversation` that `window.admin_id` authored
/// inside `[window.since, window.before]`, inclusive.
///
/// A part qualifies only when all of:
/// - its author is present and of type `"admin"`,
/// - the author ID equals the window's admin ID (both canonicalized by the
///   wire layer, so plain string equality suffices),
/// - its normalized timestamp falls inside the window.
///
/// Parts with a missing author or timestamp are skipped individually; a
/// malformed part never disqualifies the rest of the conversation.
pub fn evaluate_participation(
    conversation: &Conversation,
    window: &SearchWindow,
) -> Participation {
    let mut part_count = 0u32;

    for part in &conversation.parts {
        let Some(author) = &part.author else {
            continue;
        };
        if author.kind != "admin" {
            continue;
        }
        if author.id.as_deref() != Some(window.admin_id.as_str()) {
            continue;
        }
        let Some(raw_ts) = part.created_at else {
            continue;
        };
        let ts = normalize_epoch_seconds(raw_ts);
        if ts < window.since || ts > window.before {
            continue;
        }
        part_count += 1;
    }

    Participation {
        matched: part_count > 0,
        part_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Part, PartAuthor};

    fn admin_part(id: &str, created_at: i64) -> Part {
        Part {
            id: format!("p-{created_at}"),
            part_type: "comment".to_string(),
            author: Some(PartAuthor {
                kind: "admin".to_string(),
                id: Some(id.to_string()),
                name: Some("Agent".to_string()),
            }),
            body: Some("reply".to_string()),
            created_at: Some(created_at),
        }
    }

    fn conversation_with(parts: Vec<Part>) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            created_at: 1762740000,
            updated_at: 1762740000,
            state: None,
            subject: None,
            source_author_name: None,
            parts,
            rating: None,
            contact_ids: vec![],
        }
    }

    fn window() -> SearchWindow {
        SearchWindow::new("8742044", 1762740000, 1762826399).unwrap()
    }

    #[test]
    fn seconds_and_millis_normalize_to_the_same_value() {
        assert_eq!(normalize_epoch_seconds(1700000000), 1700000000);
        assert_eq!(normalize_epoch_seconds(1700000000000), 1700000000);
    }

    #[test]
    fn counts_admin_parts_inside_window_and_skips_bots() {
        let mut bot = admin_part("8742044", 1762740100);
        bot.author.as_mut().unwrap().kind = "bot".to_string();

        let conversation = conversation_with(vec![
            admin_part("8742044", 1762740100),
            admin_part("8742044", 1762750000),
            bot,
        ]);
        let result = evaluate_participation(&conversation, &window());
        assert!(result.matched);
        assert_eq!(result.part_count, 2);
    }

    #[test]
    fn non_admin_author_never_counts_even_with_matching_id() {
        let mut part = admin_part("8742044", 1762740100);
        part.author.as_mut().unwrap().kind = "user".to_string();
        let result = evaluate_participation(&conversation_with(vec![part]), &window());
        assert_eq!(result.part_count, 0);
        assert!(!result.matched);
    }

    #[test]
    fn prefix_ids_do_not_match() {
        let conversation = conversation_with(vec![admin_part("87420441", 1762740100)]);
        let result = evaluate_participation(&conversation, &window());
        assert!(!result.matched);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = window();
        let conversation = conversation_with(vec![
            admin_part("8742044", w.since),
            admin_part("8742044", w.before),
        ]);
        assert_eq!(evaluate_participation(&conversation, &w).part_count, 2);
    }

    #[test]
    fn part_one_second_after_the_window_is_excluded() {
        let w = window();
        let conversation = conversation_with(vec![admin_part("8742044", w.before + 1)]);
        let result = evaluate_participation(&conversation, &w);
        assert!(!result.matched);
        assert_eq!(result.part_count, 0);
    }

    #[test]
    fn millisecond_part_timestamps_are_normalized_before_the_window_test() {
        let w = window();
        let conversation = conversation_with(vec![admin_part("8742044", 1762740100 * 1000)]);
        assert_eq!(evaluate_participation(&conversation, &w).part_count, 1);
    }

    #[test]
    fn malformed_parts_are_skipped_individually() {
        let missing_author = Part {
            id: "x".to_string(),
            part_type: "comment".to_string(),
            author: None,
            body: None,
            created_at: Some(1762740100),
        };
        let mut missing_ts = admin_part("8742044", 0);
        missing_ts.created_at = None;

        let conversation = conversation_with(vec![
            missing_author,
            missing_ts,
            admin_part("8742044", 1762740100),
        ]);
        assert_eq!(evaluate_participation(&conversation, &window()).part_count, 1);
    }

    #[test]
    fn no_parts_means_no_participation() {
        let result = evaluate_participation(&conversation_with(vec![]), &window());
        assert!(!result.matched);
        assert_eq!(result.part_count, 0);
    }
}
