//! Boundary to whatever produces new questions.
//!
//! The service never talks to a model or an authoring tool directly. It asks a
//! [`ContentSource`] for a batch, checks the batch with [`validate_batch`] and
//! stores what passes.

use async_trait::async_trait;
use exs_db::NewQuestion;
use exs_srs::{BloomLevel, QuestionUsage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::retry::Retryable;

/// Fewest answer options a generated question may have.
pub const MIN_OPTIONS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("content source unavailable: {0}")]
    Unavailable(String),
    #[error("content source rate limited")]
    RateLimited,
    /// The source answered but the batch failed validation.
    #[error("invalid generated content: {0}")]
    Invalid(String),
    /// The source refused the request; retrying will not help.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl Retryable for ContentError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::RateLimited => "rate_limited",
            Self::Invalid(_) => "invalid",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// The failed question a follow-up is written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTarget {
    pub parent_question_id: Uuid,
    /// Concept of the parent, reused by the follow-up when known
    pub concept_title: Option<String>,
    /// Level the follow-up is written at
    pub bloom_level: BloomLevel,
}

/// Ask for `count` questions of one topic and usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub course_id: Uuid,
    pub topic_id: Uuid,
    pub usage: QuestionUsage,
    pub count: u32,
    /// Concepts already in the topic's bank, so the source can avoid duplicates
    #[serde(default)]
    pub covered_concepts: Vec<String>,
    /// Set when asking for a follow-up to a failed question
    #[serde(default)]
    pub follow_up: Option<FollowUpTarget>,
}

/// A question as returned by a [`ContentSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub topic_id: Uuid,
    pub concept_title: String,
    #[serde(default)]
    pub bloom_level: BloomLevel,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: u32,
}

impl GeneratedQuestion {
    /// Bank row for this question under `request`.
    ///
    /// Follow-ups take the parent's concept and the requested level, and link
    /// back to the parent.
    pub fn into_new_question(self, request: &GenerationRequest) -> NewQuestion {
        let (bloom_level, concept_title, parent_question_id) = match &request.follow_up {
            Some(target) => (
                target.bloom_level,
                target.concept_title.clone().unwrap_or(self.concept_title),
                Some(target.parent_question_id),
            ),
            None => (self.bloom_level, self.concept_title, None),
        };

        NewQuestion {
            question_id: Uuid::new_v4(),
            course_id: request.course_id,
            topic_id: self.topic_id,
            usage: request.usage,
            bloom_level,
            concept_title,
            prompt: self.prompt,
            options: self.options,
            correct_option: self.correct_option,
            parent_question_id,
        }
    }
}

/// Producer of new questions.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedQuestion>, ContentError>;
}

/// Check a generated batch against its request.
pub fn validate_batch(request: &GenerationRequest, batch: &[GeneratedQuestion]) -> Result<(), ContentError> {
    if batch.len() > request.count as usize {
        return Err(ContentError::Invalid(format!(
            "asked for {} questions, got {}",
            request.count,
            batch.len()
        )));
    }

    for (index, question) in batch.iter().enumerate() {
        if question.topic_id != request.topic_id {
            return Err(ContentError::Invalid(format!(
                "question {index} belongs to topic {}",
                question.topic_id
            )));
        }
        if question.concept_title.trim().is_empty() {
            return Err(ContentError::Invalid(format!(
                "question {index} has no concept title"
            )));
        }
        if question.prompt.trim().is_empty() {
            return Err(ContentError::Invalid(format!("question {index} has no prompt")));
        }
        if question.options.len() < MIN_OPTIONS {
            return Err(ContentError::Invalid(format!(
                "question {index} has {} options",
                question.options.len()
            )));
        }
        if question.correct_option as usize >= question.options.len() {
            return Err(ContentError::Invalid(format!(
                "question {index} points at missing option {}",
                question.correct_option
            )));
        }
    }

    Ok(())
}
