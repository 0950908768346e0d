//! Shelf state machine and session-based review scheduling.
//!
//! Questions move `active -> pending_followup -> archived` as the learner
//! builds momentum. Any wrong or blank answer drops the question back to
//! `pending_followup` with its momentum reset, whatever shelf it was on.

use serde::{Deserialize, Serialize};

use crate::types::ShelfStatus;

/// Session gaps between reviews, indexed by whole success count minus one.
pub const SESSION_GAPS: [u32; 5] = [1, 2, 5, 10, 20];

/// Momentum at which a question is archived.
pub const ARCHIVE_THRESHOLD: f64 = 3.0;

/// Momentum at which a question leaves the active shelf.
pub const FOLLOWUP_THRESHOLD: f64 = 0.5;

/// Momentum gained by a correct answer within its time budget.
pub const FAST_SUCCESS_INCREMENT: f64 = 1.0;

/// Momentum gained by a correct answer that overran its time budget.
pub const SLOW_SUCCESS_INCREMENT: f64 = 0.5;

/// New shelf position after one answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfTransition {
    pub status: ShelfStatus,
    pub success_count: f64,
}

/// Apply one answer to a question's momentum.
///
/// # Arguments
///
/// * `consecutive_success` - Momentum before this answer
/// * `is_correct` - Whether the answer was correct
/// * `is_fast` - Whether the answer arrived within its time budget
pub fn shelf_transition(consecutive_success: f64, is_correct: bool, is_fast: bool) -> ShelfTransition {
    if !is_correct {
        return ShelfTransition {
            status: ShelfStatus::PendingFollowup,
            success_count: 0.0,
        };
    }

    let increment = if is_fast {
        FAST_SUCCESS_INCREMENT
    } else {
        SLOW_SUCCESS_INCREMENT
    };
    let success_count = consecutive_success.max(0.0) + increment;

    let status = if success_count >= ARCHIVE_THRESHOLD {
        ShelfStatus::Archived
    } else if success_count >= FOLLOWUP_THRESHOLD {
        ShelfStatus::PendingFollowup
    } else {
        ShelfStatus::Active
    };

    ShelfTransition {
        status,
        success_count,
    }
}

/// Gap in sessions before the next review for a given momentum.
///
/// * Momentum < 2: 1 session
/// * Momentum 2: 2 sessions
/// * Momentum 3: 5 sessions
/// * Momentum 4: 10 sessions
/// * Momentum >= 5: 20 sessions
pub fn session_gap(success_count: f64) -> u32 {
    let whole = success_count.max(1.0).floor() as usize;
    let index = whole.saturating_sub(1).min(SESSION_GAPS.len() - 1);
    SESSION_GAPS[index]
}

/// Session number at which a question becomes due again.
pub fn next_review_session(current_session: u32, success_count: f64) -> u32 {
    current_session.saturating_add(session_gap(success_count))
}

/// Review session for a transition, `None` while the question stays active.
pub fn schedule(transition: &ShelfTransition, current_session: u32) -> Option<u32> {
    match transition.status {
        ShelfStatus::Active => None,
        ShelfStatus::PendingFollowup | ShelfStatus::Archived => {
            Some(next_review_session(current_session, transition.success_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incorrect_always_demotes() {
        for prior in [0.0, 0.5, 1.5, 2.5, 3.0, 7.0] {
            let t = shelf_transition(prior, false, true);
            assert_eq!(t.status, ShelfStatus::PendingFollowup);
            assert_eq!(t.success_count, 0.0);
        }
    }

    #[test]
    fn test_correct_increments() {
        let fast = shelf_transition(1.0, true, true);
        assert_eq!(fast.success_count, 2.0);
        assert_eq!(fast.status, ShelfStatus::PendingFollowup);

        let slow = shelf_transition(1.0, true, false);
        assert_eq!(slow.success_count, 1.5);
        assert_eq!(slow.status, ShelfStatus::PendingFollowup);

        let first_slow = shelf_transition(0.0, true, false);
        assert_eq!(first_slow.success_count, 0.5);
        assert_eq!(first_slow.status, ShelfStatus::PendingFollowup);
    }

    #[test]
    fn test_three_fast_correct_answers_archive_on_the_third() {
        let first = shelf_transition(0.0, true, true);
        assert_eq!(first.status, ShelfStatus::PendingFollowup);

        let second = shelf_transition(first.success_count, true, true);
        assert_eq!(second.status, ShelfStatus::PendingFollowup);

        let third = shelf_transition(second.success_count, true, true);
        assert_eq!(third.status, ShelfStatus::Archived);
        assert_eq!(third.success_count, 3.0);
    }

    #[test]
    fn test_slow_answers_need_six_to_archive() {
        let mut momentum = 0.0;
        for _ in 0..5 {
            let t = shelf_transition(momentum, true, false);
            assert_ne!(t.status, ShelfStatus::Archived);
            momentum = t.success_count;
        }
        assert_eq!(shelf_transition(momentum, true, false).status, ShelfStatus::Archived);
    }

    #[test]
    fn test_session_gaps() {
        assert_eq!(next_review_session(10, 0.0), 11);
        assert_eq!(next_review_session(10, 0.5), 11);
        assert_eq!(next_review_session(10, 1.0), 11);
        assert_eq!(next_review_session(10, 1.5), 11);
        assert_eq!(next_review_session(10, 2.0), 12);
        assert_eq!(next_review_session(10, 2.5), 12);
        assert_eq!(next_review_session(10, 3.0), 15);
        assert_eq!(next_review_session(10, 4.0), 20);
        assert_eq!(next_review_session(10, 5.0), 30);
        assert_eq!(next_review_session(10, 42.0), 30);
    }

    #[test]
    fn test_schedule_only_for_review_shelves() {
        let active = ShelfTransition {
            status: ShelfStatus::Active,
            success_count: 0.0,
        };
        assert_eq!(schedule(&active, 4), None);

        let archived = shelf_transition(2.0, true, true);
        assert_eq!(schedule(&archived, 4), Some(9));
    }
}
