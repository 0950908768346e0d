//! Question generation through the content source, with retries and
//! validation, and bank replenishment per topic.

use exs_db::NewQuestion;
use exs_srs::{
    BloomLevel, QuestionUsage,
    quota::{GenerationQuotas, generation_quotas},
    time_budget::DEFAULT_CONCEPT_COUNT,
};
use uuid::Uuid;

use crate::{
    content::{ContentError, FollowUpTarget, GenerationRequest, validate_batch},
    error::ServiceError,
    metrics,
    retry::retry,
    state::ServiceState,
};

/// Failures in a row after which a follow-up is written one bloom level lower.
pub const SCAFFOLD_AFTER_FAILS: u32 = 2;

/// Generate up to `count` questions for a topic and store the ones that pass
/// validation. Returns the new question ids.
///
/// Concepts already in the topic's bank are passed to the source as covered.
/// A source that keeps failing surfaces as [`ServiceError::Content`].
pub async fn generate_questions(
    state: &ServiceState,
    course_id: Uuid,
    topic_id: Uuid,
    usage: QuestionUsage,
    count: u32,
) -> Result<Vec<Uuid>, ServiceError> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let request = GenerationRequest {
        course_id,
        topic_id,
        usage,
        count,
        covered_concepts: state.store.topic_concepts(topic_id).await?,
        follow_up: None,
    };
    run_generation(state, &request).await
}

/// Generate one training follow-up for a question the learner just failed.
///
/// The follow-up keeps the parent's concept and links back to it. After
/// [`SCAFFOLD_AFTER_FAILS`] failures in a row it is written one bloom level
/// below the parent. Returns `None` when the parent has no topic or the
/// source produced nothing usable.
#[tracing::instrument(skip(state))]
pub async fn generate_follow_up(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    question_id: Uuid,
) -> Result<Option<Uuid>, ServiceError> {
    let parent = state
        .store
        .question_meta(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question {question_id}")))?;
    let Some(topic_id) = parent.topic_id else {
        tracing::debug!("Question has no topic, skipping follow-up");
        return Ok(None);
    };

    let fails = state
        .store
        .question_status(user_id, question_id)
        .await?
        .map_or(0, |status| status.consecutive_fails);
    let parent_level = parent.bloom_level.unwrap_or(BloomLevel::Application);
    let bloom_level = if fails >= SCAFFOLD_AFTER_FAILS {
        parent_level.lower()
    } else {
        parent_level
    };

    let request = GenerationRequest {
        course_id,
        topic_id,
        usage: QuestionUsage::Training,
        count: 1,
        covered_concepts: Vec::new(),
        follow_up: Some(FollowUpTarget {
            parent_question_id: question_id,
            concept_title: parent.concept_title,
            bloom_level,
        }),
    };
    let ids = run_generation(state, &request).await?;

    tracing::debug!(fails, %bloom_level, follow_up = ?ids.first(), "Follow-up generated");
    Ok(ids.first().copied())
}

async fn run_generation(
    state: &ServiceState,
    request: &GenerationRequest,
) -> Result<Vec<Uuid>, ServiceError> {
    let attempted = retry(state.retry_policy, "generate_questions", |_| {
        let content = state.content.clone();
        let request = request.clone();
        async move {
            let batch = content.generate(&request).await?;
            validate_batch(&request, &batch)?;
            Ok::<_, ContentError>(batch)
        }
    })
    .await?;

    tracing::debug!(
        topic_id = %request.topic_id,
        usage = %request.usage,
        attempts = attempted.attempts,
        generated = attempted.value.len(),
        "Questions generated"
    );

    let rows: Vec<NewQuestion> = attempted
        .value
        .into_iter()
        .map(|q| q.into_new_question(request))
        .collect();
    state.store.save_questions(&rows).await?;
    metrics::record_generated_questions(rows.len());

    Ok(rows.iter().map(|row| row.question_id).collect())
}

/// Bring a topic's bank up to its generation targets.
///
/// Returns how many questions were added per usage. Stops at the first
/// usage whose generation fails.
#[tracing::instrument(skip(state))]
pub async fn replenish_topic(
    state: &ServiceState,
    course_id: Uuid,
    topic_id: Uuid,
) -> Result<GenerationQuotas, ServiceError> {
    let topic = state
        .topic_meta(topic_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("topic {topic_id}")))?;
    let targets = generation_quotas(topic.concept_count.unwrap_or(DEFAULT_CONCEPT_COUNT));

    let mut added = GenerationQuotas {
        training: 0,
        archive: 0,
        mock_exam: 0,
    };
    for (usage, target, slot) in [
        (QuestionUsage::Training, targets.training, &mut added.training),
        (QuestionUsage::Archive, targets.archive, &mut added.archive),
        (QuestionUsage::MockExam, targets.mock_exam, &mut added.mock_exam),
    ] {
        let existing = state
            .store
            .questions_for_usage(topic_id, usage, target as usize)
            .await?
            .len();
        let missing = target.saturating_sub(u32::try_from(existing).unwrap_or(u32::MAX));
        let ids = generate_questions(state, course_id, topic_id, usage, missing).await?;
        *slot = u32::try_from(ids.len()).unwrap_or(u32::MAX);
    }

    tracing::info!(
        training = added.training,
        archive = added.archive,
        mock_exam = added.mock_exam,
        "Topic replenished"
    );
    Ok(added)
}
