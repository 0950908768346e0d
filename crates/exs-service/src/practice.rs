use exs_db::ProgressRecord;
use exs_srs::{
    QuestionUsage, ResponseType, ReviewItem, ShelfStatus, SubmissionInput, SubmissionResult,
    TopicMastery,
    review_queue::PRIORITY_FOLLOWUP,
    score::{AdvancedScore, advanced_score},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    generation::generate_follow_up,
    metrics, session,
    state::ServiceState,
    validation::{ResponseSubmission, validate_submission},
};

/// What [`submit_response`] evaluated and what it created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    /// Core evaluation of the answer
    pub result: SubmissionResult,
    /// Bloom and time weighted score, when the question's level is known
    pub advanced_score: Option<AdvancedScore>,
    /// Follow-up generated for an incorrect training answer
    pub follow_up_id: Option<Uuid>,
}

/// Evaluate one answer and persist the resulting state.
///
/// Writes the question's shelf row and a progress record. Training answers
/// also update the topic mastery row; mock-exam answers do not. An incorrect
/// training answer gets a follow-up question, which is placed right after
/// its parent in the in-progress quiz. The answer is then counted against
/// that quiz if there is one.
#[tracing::instrument(
    skip(state, submission),
    fields(
        user_id = %submission.user_id,
        question_id = %submission.question_id,
        response = %submission.response,
    )
)]
pub async fn submit_response(
    state: &ServiceState,
    submission: ResponseSubmission,
) -> Result<AnswerOutcome, ServiceError> {
    validate_submission(&submission)?;
    let store = &state.store;

    let current_status = store
        .question_status(submission.user_id, submission.question_id)
        .await?;
    let question = store.question_meta(submission.question_id).await?;
    let topic_id = submission
        .topic_id
        .or_else(|| question.as_ref().and_then(|q| q.topic_id));
    let usage = question.as_ref().map(|q| q.usage);
    let bloom_level = question.as_ref().and_then(|q| q.bloom_level);

    // Coverage is measured before this answer lands
    let (topic, mastery, unique_solved, total_topic_questions) = match topic_id {
        Some(topic_id) => (
            state.topic_meta(topic_id).await?,
            store.topic_mastery(submission.user_id, topic_id).await?,
            store.unique_solved_in_topic(submission.user_id, topic_id).await?,
            store.topic_question_count(topic_id).await?,
        ),
        None => (None, None, 0, 0),
    };

    let result = exs_srs::submit_response(&SubmissionInput {
        current_status,
        response: submission.response,
        time_spent_ms: submission.time_spent_ms,
        question,
        topic,
        mastery: mastery.clone(),
        unique_solved,
        total_topic_questions,
        session_number: submission.session_number,
    });

    store
        .save_question_status(
            submission.user_id,
            submission.question_id,
            &result.question_status(),
        )
        .await?;

    store
        .record_progress(&ProgressRecord {
            user_id: submission.user_id,
            question_id: submission.question_id,
            topic_id,
            course_id: submission.course_id,
            response: submission.response,
            selected_answer: submission.selected_answer,
            session_number: submission.session_number,
            time_spent_ms: submission.time_spent_ms,
        })
        .await?;

    if let Some(topic_id) = topic_id.filter(|_| usage != Some(QuestionUsage::MockExam)) {
        let previous = mastery.unwrap_or_else(|| TopicMastery::new(topic_id));
        let updated = TopicMastery {
            topic_id,
            mastery_score: result.new_mastery,
            last_reviewed_session: submission.session_number,
            total_questions_seen: previous.total_questions_seen.saturating_add(1),
        };
        store
            .save_topic_mastery(submission.user_id, submission.course_id, &updated)
            .await?;
    }

    let follow_up_id = match topic_id {
        Some(topic_id)
            if submission.response == ResponseType::Incorrect
                && usage == Some(QuestionUsage::Training)
                && state.config.generate_follow_ups =>
        {
            follow_up(state, &submission, topic_id).await?
        }
        _ => None,
    };

    session::record_answer(
        state,
        submission.user_id,
        submission.course_id,
        submission.question_id,
        submission.response,
        submission.time_spent_ms,
    )
    .await?;

    metrics::record_response(submission.response, result.is_topic_refreshed);
    tracing::debug!(
        new_status = %result.new_status,
        next_review = ?result.next_review_session,
        mastery = result.new_mastery,
        delta = result.score_delta,
        "Response recorded"
    );

    Ok(AnswerOutcome {
        advanced_score: bloom_level
            .map(|level| advanced_score(result.score_delta, level, submission.time_spent_ms)),
        result,
        follow_up_id,
    })
}

/// Generate a follow-up and slot it into the quiz. A generation failure is
/// logged and leaves the answer recorded without one.
async fn follow_up(
    state: &ServiceState,
    submission: &ResponseSubmission,
    topic_id: Uuid,
) -> Result<Option<Uuid>, ServiceError> {
    let generated = generate_follow_up(
        state,
        submission.user_id,
        submission.course_id,
        submission.question_id,
    )
    .await;
    let follow_up_id = match generated {
        Ok(Some(id)) => id,
        Ok(None) => return Ok(None),
        Err(err) => {
            tracing::warn!(error = %err, "Follow-up generation failed");
            return Ok(None);
        }
    };

    session::inject_follow_up(
        state,
        submission.user_id,
        submission.course_id,
        submission.question_id,
        ReviewItem {
            question_id: follow_up_id,
            topic_id,
            course_id: submission.course_id,
            status: ShelfStatus::PendingFollowup,
            priority: PRIORITY_FOLLOWUP,
        },
    )
    .await?;
    Ok(Some(follow_up_id))
}
