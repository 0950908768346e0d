//! The full response-submission pipeline: speed classification, shelf
//! transition, scheduling and mastery blending in one pure call.

use serde::{Deserialize, Serialize};

use crate::{
    score::{blended_mastery, score_change},
    shelf::{schedule, shelf_transition},
    time_budget::classify_response_time,
    types::{QuestionMeta, QuestionStatus, QuestionUsage, ResponseType, ShelfStatus, TopicMastery, TopicMeta},
};

/// Everything the pipeline needs to evaluate one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionInput {
    /// Stored shelf state, `None` on the first attempt.
    pub current_status: Option<QuestionStatus>,
    pub response: ResponseType,
    pub time_spent_ms: u64,
    pub question: Option<QuestionMeta>,
    pub topic: Option<TopicMeta>,
    /// Stored mastery of the question's topic, `None` if never touched.
    pub mastery: Option<TopicMastery>,
    /// Distinct questions of the topic the learner has answered.
    pub unique_solved: u32,
    /// Questions available in the topic.
    pub total_topic_questions: u32,
    pub session_number: u32,
}

/// Outcome of one answer, ready to be persisted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub is_correct: bool,
    /// Raw score delta before clamping.
    pub score_delta: i32,
    pub new_mastery: i32,
    pub new_status: ShelfStatus,
    pub next_review_session: Option<u32>,
    pub is_topic_refreshed: bool,
    pub new_success_count: f64,
    pub new_fails_count: u32,
}

impl SubmissionResult {
    /// Shelf row to store for the question.
    pub const fn question_status(&self) -> QuestionStatus {
        QuestionStatus {
            status: self.new_status,
            consecutive_success: self.new_success_count,
            consecutive_fails: self.new_fails_count,
            next_review_session: self.next_review_session,
        }
    }
}

/// Evaluate one answer.
///
/// Mock-exam questions sit outside the shelf system: they leave mastery and
/// momentum untouched and are always reported as active.
pub fn submit_response(input: &SubmissionInput) -> SubmissionResult {
    let is_correct = input.response == ResponseType::Correct;
    let prior = input.current_status.clone().unwrap_or_default();
    let previous_mastery = input.mastery.as_ref().map_or(0, |m| m.mastery_score);

    if input
        .question
        .as_ref()
        .is_some_and(|q| q.usage == QuestionUsage::MockExam)
    {
        return SubmissionResult {
            is_correct,
            score_delta: 0,
            new_mastery: previous_mastery,
            new_status: ShelfStatus::Active,
            next_review_session: None,
            is_topic_refreshed: false,
            new_success_count: prior.consecutive_success,
            new_fails_count: prior.consecutive_fails,
        };
    }

    let budget_inputs = match (&input.question, &input.topic) {
        (Some(question), Some(topic)) => Some((
            topic.char_count,
            topic.concept_count,
            question.bloom_level.unwrap_or_default(),
        )),
        _ => None,
    };
    let is_fast = classify_response_time(input.time_spent_ms, budget_inputs);

    let transition = shelf_transition(prior.consecutive_success, is_correct, is_fast);
    let next_review_session = schedule(&transition, input.session_number);

    let change = score_change(input.response, previous_mastery, prior.is_repeated());
    let blend = blended_mastery(
        input.unique_solved,
        input.total_topic_questions,
        change.new_score,
    );

    SubmissionResult {
        is_correct,
        score_delta: change.delta,
        new_mastery: blend.mastery,
        new_status: transition.status,
        next_review_session,
        is_topic_refreshed: blend.is_topic_refreshed,
        new_success_count: transition.success_count,
        new_fails_count: if is_correct {
            0
        } else {
            prior.consecutive_fails.saturating_add(1)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BloomLevel;
    use uuid::Uuid;

    fn input(response: ResponseType, status: Option<QuestionStatus>) -> SubmissionInput {
        let topic_id = Uuid::new_v4();
        SubmissionInput {
            current_status: status,
            response,
            time_spent_ms: 5_000,
            question: Some(QuestionMeta {
                question_id: Uuid::new_v4(),
                topic_id: Some(topic_id),
                bloom_level: Some(BloomLevel::Knowledge),
                concept_title: Some("Separation of powers".to_string()),
                usage: QuestionUsage::Training,
                parent_question_id: None,
            }),
            topic: Some(TopicMeta {
                topic_id,
                char_count: 1_560,
                concept_count: Some(4),
                difficulty_index: Some(3.0),
            }),
            mastery: Some(TopicMastery {
                mastery_score: 40,
                ..TopicMastery::new(topic_id)
            }),
            unique_solved: 5,
            total_topic_questions: 10,
            session_number: 7,
        }
    }

    #[test]
    fn test_fast_correct_from_two_archives() {
        let status = QuestionStatus {
            status: ShelfStatus::PendingFollowup,
            consecutive_success: 2.0,
            consecutive_fails: 0,
            next_review_session: Some(7),
        };
        let result = submit_response(&input(ResponseType::Correct, Some(status)));

        assert!(result.is_correct);
        assert_eq!(result.new_success_count, 3.0);
        assert_eq!(result.new_status, ShelfStatus::Archived);
        assert_eq!(result.next_review_session, Some(12));
        assert_eq!(result.new_fails_count, 0);
        assert_eq!(result.score_delta, 10);
    }

    #[test]
    fn test_incorrect_on_active_resets_momentum() {
        let status = QuestionStatus {
            status: ShelfStatus::Active,
            consecutive_success: 1.5,
            consecutive_fails: 0,
            next_review_session: None,
        };
        let result = submit_response(&input(ResponseType::Incorrect, Some(status)));

        assert!(!result.is_correct);
        assert_eq!(result.new_success_count, 0.0);
        assert_eq!(result.new_status, ShelfStatus::PendingFollowup);
        assert_eq!(result.next_review_session, Some(8));
        assert_eq!(result.new_fails_count, 1);
        // Momentum 1.5 means this is a repeated attempt
        assert_eq!(result.score_delta, -10);
    }

    #[test]
    fn test_first_attempt_penalties() {
        let wrong = submit_response(&input(ResponseType::Incorrect, None));
        assert_eq!(wrong.score_delta, -5);
        // coverage 0.5 * 60 = 30, score 35 * 0.4 = 14
        assert_eq!(wrong.new_mastery, 44);

        let blank = submit_response(&input(ResponseType::Blank, None));
        assert_eq!(blank.score_delta, -2);
        assert_eq!(blank.new_status, ShelfStatus::PendingFollowup);
    }

    #[test]
    fn test_repeated_failures_accumulate() {
        let status = QuestionStatus {
            status: ShelfStatus::PendingFollowup,
            consecutive_success: 0.0,
            consecutive_fails: 2,
            next_review_session: Some(7),
        };
        let result = submit_response(&input(ResponseType::Blank, Some(status)));
        assert_eq!(result.score_delta, -10);
        assert_eq!(result.new_fails_count, 3);
    }

    #[test]
    fn test_slow_correct_gains_half() {
        let mut slow = input(ResponseType::Correct, None);
        // Budget: 2 min reading + 23s complexity + 10s buffer = 153s
        slow.time_spent_ms = 153_001;
        let result = submit_response(&slow);
        assert_eq!(result.new_success_count, 0.5);
        assert_eq!(result.new_status, ShelfStatus::PendingFollowup);
        assert_eq!(result.next_review_session, Some(8));
    }

    #[test]
    fn test_missing_metadata_uses_flat_threshold() {
        let mut no_topic = input(ResponseType::Correct, None);
        no_topic.topic = None;
        no_topic.time_spent_ms = 31_000;
        assert_eq!(submit_response(&no_topic).new_success_count, 0.5);

        no_topic.time_spent_ms = 29_000;
        assert_eq!(submit_response(&no_topic).new_success_count, 1.0);
    }

    #[test]
    fn test_mock_exam_questions_do_not_move_state() {
        let status = QuestionStatus {
            status: ShelfStatus::PendingFollowup,
            consecutive_success: 1.0,
            consecutive_fails: 0,
            next_review_session: Some(9),
        };
        let mut mock = input(ResponseType::Incorrect, Some(status));
        if let Some(question) = mock.question.as_mut() {
            question.usage = QuestionUsage::MockExam;
        }

        let result = submit_response(&mock);
        assert_eq!(result.score_delta, 0);
        assert_eq!(result.new_mastery, 40);
        assert_eq!(result.new_status, ShelfStatus::Active);
        assert_eq!(result.next_review_session, None);
        assert_eq!(result.new_success_count, 1.0);
        assert_eq!(result.new_fails_count, 0);
    }

    #[test]
    fn test_question_status_row() {
        let result = submit_response(&input(ResponseType::Correct, None));
        let row = result.question_status();
        assert_eq!(row.status, ShelfStatus::PendingFollowup);
        assert_eq!(row.consecutive_success, 1.0);
        assert_eq!(row.next_review_session, Some(8));
    }
}
