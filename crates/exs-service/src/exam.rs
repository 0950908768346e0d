//! Mock exam composition.
//!
//! The exam size is split across the course's topics with the quota
//! allocator, then each topic's share is filled from its mock-exam bank.
//! Topics whose bank is short are topped up through the content source, a
//! few topics at a time. A topic whose generation fails keeps what its bank
//! had and the section reports the shortfall.

use std::collections::HashMap;

use exs_srs::{
    Importance, QuestionUsage, TopicMetrics, allocate_quotas, quota::DEFAULT_DIFFICULTY_INDEX,
    time_budget::DEFAULT_CONCEPT_COUNT,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ServiceError, generation::generate_questions, state::ServiceState};

/// Questions picked for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSection {
    pub topic_id: Uuid,
    /// Questions allocated to this topic
    pub quota: u32,
    pub question_ids: Vec<Uuid>,
    /// How many of `question_ids` were generated for this exam
    pub generated: u32,
}

impl ExamSection {
    /// Allocated questions that could not be filled.
    pub fn shortfall(&self) -> u32 {
        self.quota
            .saturating_sub(u32::try_from(self.question_ids.len()).unwrap_or(u32::MAX))
    }
}

/// A composed mock exam.
///
/// Sections may hold fewer questions than their quota when the bank was short
/// and generation failed; see [`ExamSection::shortfall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPlan {
    pub course_id: Uuid,
    /// Requested exam length
    pub exam_total: u32,
    /// One section per course topic, in syllabus order
    pub sections: Vec<ExamSection>,
}

impl ExamPlan {
    /// All question ids in section order.
    pub fn question_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.sections.iter().flat_map(|s| s.question_ids.iter().copied())
    }
}

/// Compose a mock exam for a learner.
///
/// # Arguments
///
/// * `importance` - Exam importance of the course
/// * `exam_total` - Exam length, the configured default when `None`
#[tracing::instrument(skip(state))]
pub async fn compose_exam(
    state: &ServiceState,
    user_id: Uuid,
    course_id: Uuid,
    importance: Importance,
    exam_total: Option<u32>,
) -> Result<ExamPlan, ServiceError> {
    let exam_total = exam_total.unwrap_or(state.config.exam_total);
    let topics = state.store.course_topics(course_id).await?;
    let mastery: HashMap<Uuid, i32> = state
        .store
        .course_mastery(user_id, course_id)
        .await?
        .into_iter()
        .map(|m| (m.topic_id, m.mastery_score))
        .collect();

    let metrics: Vec<TopicMetrics> = topics
        .iter()
        .map(|topic| TopicMetrics {
            topic_id: topic.topic_id,
            concept_count: topic.concept_count.unwrap_or(DEFAULT_CONCEPT_COUNT),
            difficulty_index: topic.difficulty_index.unwrap_or(DEFAULT_DIFFICULTY_INDEX),
            mastery_score: mastery.get(&topic.topic_id).copied().unwrap_or(0),
        })
        .collect();
    let quotas = allocate_quotas(exam_total, importance, &metrics);

    let fills = quotas.iter().map(|quota| async move {
        let mut question_ids = state
            .store
            .questions_for_usage(quota.topic_id, QuestionUsage::MockExam, quota.count as usize)
            .await?;
        let missing = quota
            .count
            .saturating_sub(u32::try_from(question_ids.len()).unwrap_or(u32::MAX));

        let generated =
            match generate_questions(state, course_id, quota.topic_id, QuestionUsage::MockExam, missing)
                .await
            {
                Ok(ids) => ids,
                Err(ServiceError::Content(err)) => {
                    tracing::warn!(
                        topic_id = %quota.topic_id,
                        missing,
                        attempts = err.attempts(),
                        error = %err,
                        "Generation failed, section left short"
                    );
                    Vec::new()
                }
                Err(err) => return Err(err),
            };
        let generated_count = u32::try_from(generated.len()).unwrap_or(u32::MAX);
        question_ids.extend(generated);
        question_ids.truncate(quota.count as usize);

        Ok::<_, ServiceError>(ExamSection {
            topic_id: quota.topic_id,
            quota: quota.count,
            question_ids,
            generated: generated_count,
        })
    });
    let sections = state
        .generation_pool
        .run_all(fills)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let plan = ExamPlan {
        course_id,
        exam_total,
        sections,
    };
    let shortfall: u32 = plan.sections.iter().map(ExamSection::shortfall).sum();
    if shortfall > 0 {
        tracing::warn!(shortfall, "Exam composed with missing questions");
    } else {
        tracing::info!(topics = plan.sections.len(), "Exam composed");
    }

    Ok(plan)
}
