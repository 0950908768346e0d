use exs_srs::{BloomLevel, QuestionMeta, QuestionUsage, ResponseType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One answered question, appended to the learner's progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub question_id: Uuid,
    /// Topic the question belongs to, when known
    pub topic_id: Option<Uuid>,
    pub course_id: Uuid,
    pub response: ResponseType,
    /// Option index picked by the learner, `None` for blank answers
    pub selected_answer: Option<u32>,
    pub session_number: u32,
    pub time_spent_ms: u64,
}

/// A question to insert into the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_id: Uuid,
    pub course_id: Uuid,
    pub topic_id: Uuid,
    pub usage: QuestionUsage,
    pub bloom_level: BloomLevel,
    pub concept_title: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: u32,
    /// Set for follow-up questions derived from another question
    pub parent_question_id: Option<Uuid>,
}

impl NewQuestion {
    /// Scheduling view of the question.
    pub fn meta(&self) -> QuestionMeta {
        QuestionMeta {
            question_id: self.question_id,
            topic_id: Some(self.topic_id),
            bloom_level: Some(self.bloom_level),
            concept_title: Some(self.concept_title.clone()),
            usage: self.usage,
            parent_question_id: self.parent_question_id,
        }
    }
}
