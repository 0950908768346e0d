//! The persistence contract the service layer is written against.

use async_trait::async_trait;
use chrono::NaiveDate;
use exs_srs::{
    QuestionMeta, QuestionStatus, QuestionUsage, QueueSnapshot, SessionActivation, SessionCounter,
    TopicMastery, TopicMeta,
};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{NewQuestion, ProgressRecord},
};

/// Learner state and question bank access.
///
/// Implementations must make [`StudyStore::activate_session`] atomic per
/// learner and course so two concurrent activations never both increment.
#[async_trait]
pub trait StudyStore: Send + Sync {
    /// Shelf row of a question, `None` if the learner never answered it.
    async fn question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<QuestionStatus>, StoreError>;

    /// Upsert the shelf row of a question.
    async fn save_question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        status: &QuestionStatus,
    ) -> Result<(), StoreError>;

    async fn question_meta(&self, question_id: Uuid) -> Result<Option<QuestionMeta>, StoreError>;

    async fn topic_meta(&self, topic_id: Uuid) -> Result<Option<TopicMeta>, StoreError>;

    async fn topic_mastery(
        &self,
        user_id: Uuid,
        topic_id: Uuid,
    ) -> Result<Option<TopicMastery>, StoreError>;

    /// Upsert the mastery row of a topic and mark it as the most recently touched.
    async fn save_topic_mastery(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        mastery: &TopicMastery,
    ) -> Result<(), StoreError>;

    /// Questions of the topic the learner has moved past `active`.
    async fn unique_solved_in_topic(&self, user_id: Uuid, topic_id: Uuid) -> Result<u32, StoreError>;

    /// Questions in the topic's bank.
    async fn topic_question_count(&self, topic_id: Uuid) -> Result<u32, StoreError>;

    /// Distinct concept titles of the topic's bank, oldest first.
    async fn topic_concepts(&self, topic_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Append one answer to the progress log.
    async fn record_progress(&self, record: &ProgressRecord) -> Result<(), StoreError>;

    async fn session_counter(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<SessionCounter>, StoreError>;

    /// Activate the course for `today` and persist the resulting counter.
    async fn activate_session(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        today: NaiveDate,
    ) -> Result<SessionActivation, StoreError>;

    /// Everything the review queue builder reads for one learner and course.
    ///
    /// Only training questions are included, both in the shelf rows and in
    /// the candidate list.
    async fn queue_snapshot(&self, user_id: Uuid, course_id: Uuid) -> Result<QueueSnapshot, StoreError>;

    /// Topics of a course in syllabus order.
    async fn course_topics(&self, course_id: Uuid) -> Result<Vec<TopicMeta>, StoreError>;

    /// Mastery rows the learner has for a course.
    async fn course_mastery(&self, user_id: Uuid, course_id: Uuid) -> Result<Vec<TopicMastery>, StoreError>;

    /// Up to `limit` question ids of a topic with the given usage, oldest first.
    async fn questions_for_usage(
        &self,
        topic_id: Uuid,
        usage: QuestionUsage,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Insert questions into the bank.
    async fn save_questions(&self, questions: &[NewQuestion]) -> Result<(), StoreError>;
}
