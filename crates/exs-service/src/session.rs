//! Session lifecycle: activate the course, build the queue, keep the
//! in-progress quiz alive between requests, and close it with a summary.

use chrono::NaiveDate;
use exs_srs::{
    ResponseType, ReviewItem, SessionActivation, SessionContext, SessionSummary, SessionTally,
    build_review_queue,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ServiceError, metrics, state::ServiceState};

/// A quiz in progress, persisted in the key-value store between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub session_number: u32,
    pub target_topic: Option<Uuid>,
    pub queue: Vec<ReviewItem>,
    /// Questions answered so far, in answer order
    #[serde(default)]
    pub answered: Vec<Uuid>,
    #[serde(default)]
    pub tally: SessionTally,
}

impl QuizSession {
    /// Queue items not answered yet.
    pub fn remaining(&self) -> impl Iterator<Item = &ReviewItem> {
        self.queue
            .iter()
            .filter(|item| !self.answered.contains(&item.question_id))
    }
}

pub(crate) fn session_key(user_id: Uuid, course_id: Uuid) -> String {
    format!("quiz_session:{user_id}:{course_id}")
}

/// Activate the course for `today`.
#[tracing::instrument(skip(state))]
pub async fn start_session(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    today: NaiveDate,
) -> Result<SessionActivation, ServiceError> {
    let activation = state.store.activate_session(user_id, course_id, today).await?;

    tracing::info!(
        session = activation.counter.current_session,
        is_new = activation.is_new_session,
        first = activation.is_first_session(),
        "Session activated"
    );

    Ok(activation)
}

/// Build the review queue for the current session and persist it as the
/// in-progress quiz.
///
/// # Arguments
///
/// * `limit` - Queue length, the configured default when `None`
/// * `target_topic` - Topic the learner picked, if any
#[tracing::instrument(skip(state))]
pub async fn build_session_queue(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    limit: Option<usize>,
    target_topic: Option<Uuid>,
) -> Result<QuizSession, ServiceError> {
    let counter = state
        .store
        .session_counter(user_id, course_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no session started for course {course_id}")))?;

    let ctx = SessionContext {
        user_id,
        course_id,
        session_number: counter.current_session,
    };
    let snapshot = state.store.queue_snapshot(user_id, course_id).await?;
    let limit = limit.unwrap_or(state.config.queue_limit);
    let queue = build_review_queue(&ctx, &snapshot, limit, target_topic);

    metrics::record_queue_size(queue.len(), target_topic.is_some());
    tracing::info!(
        session = ctx.session_number,
        queue_len = queue.len(),
        limit,
        "Review queue built"
    );

    let session = QuizSession {
        user_id,
        course_id,
        session_number: ctx.session_number,
        target_topic,
        queue,
        answered: Vec::new(),
        tally: SessionTally::default(),
    };
    save_session(state, &session).await?;

    Ok(session)
}

/// The in-progress quiz, if one exists and has not expired.
pub async fn resume_session(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<Option<QuizSession>, ServiceError> {
    let Some(raw) = state.kv.get(&session_key(user_id, course_id)).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Close the in-progress quiz and summarize it.
#[tracing::instrument(skip(state))]
pub async fn finish_session(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let session = resume_session(state, user_id, course_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no quiz in progress for course {course_id}")))?;

    state.kv.remove(&session_key(user_id, course_id)).await?;

    let summary = session.tally.summary();
    tracing::info!(
        session = session.session_number,
        answered = session.tally.answered(),
        percentage = summary.percentage,
        "Quiz finished"
    );
    Ok(summary)
}

/// Count an answer against the in-progress quiz, if there is one.
///
/// Repeated answers to the same question are counted once.
pub(crate) async fn record_answer(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    question_id: Uuid,
    response: ResponseType,
    time_spent_ms: u64,
) -> Result<(), ServiceError> {
    let Some(mut session) = resume_session(state, user_id, course_id).await? else {
        return Ok(());
    };
    if session.answered.contains(&question_id) {
        return Ok(());
    }

    session.answered.push(question_id);
    session.tally.record(response, time_spent_ms);
    save_session(state, &session).await
}

/// Place a follow-up right after its parent in the in-progress quiz, or at
/// the end when the parent is not queued. No-op without a quiz.
pub(crate) async fn inject_follow_up(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    parent_id: Uuid,
    item: ReviewItem,
) -> Result<(), ServiceError> {
    let Some(mut session) = resume_session(state, user_id, course_id).await? else {
        return Ok(());
    };
    if session.queue.iter().any(|queued| queued.question_id == item.question_id) {
        return Ok(());
    }

    let position = session
        .queue
        .iter()
        .position(|queued| queued.question_id == parent_id)
        .map_or(session.queue.len(), |index| index + 1);
    tracing::debug!(follow_up = %item.question_id, position, "Follow-up queued");
    session.queue.insert(position, item);
    save_session(state, &session).await
}

async fn save_session(state: &ServiceState, session: &QuizSession) -> Result<(), ServiceError> {
    let raw = serde_json::to_string(session)?;
    state
        .kv
        .set(
            &session_key(session.user_id, session.course_id),
            raw,
            state.config.session_state_ttl(),
        )
        .await?;
    Ok(())
}
