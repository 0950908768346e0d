//! Shared value types for the decision core.
//!
//! Every enum here is stored as lowercase snake_case text by the persistence
//! layer, so each one round-trips through [`std::str::FromStr`] and `as_str`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when stored text does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Stored text form.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Shelf position of a question for one learner.
    ShelfStatus as "shelf status" {
        /// Not yet answered correctly; no review is scheduled.
        Active => "active",
        /// Answered at least once and waiting for its next review session.
        PendingFollowup => "pending_followup",
        /// Mastered; resurfaces occasionally as an archive review.
        Archived => "archived",
    }
}

text_enum! {
    /// Outcome of a single answer.
    ResponseType as "response type" {
        Correct => "correct",
        Incorrect => "incorrect",
        /// Skipped or timed out without choosing an option.
        Blank => "blank",
    }
}

text_enum! {
    /// Cognitive-difficulty tag of a question.
    BloomLevel as "bloom level" {
        /// Recall of facts and definitions.
        Knowledge => "knowledge",
        /// Using a concept on a concrete case.
        Application => "application",
        /// Comparing, breaking down or judging several concepts.
        Analysis => "analysis",
    }
}

text_enum! {
    /// What a question was generated for.
    QuestionUsage as "question usage" {
        /// Regular practice question that goes through the shelf system.
        Training => "training",
        /// Question reserved for archive refreshes.
        Archive => "archive",
        /// Timed mock-exam question. Never affects shelf state or mastery.
        MockExam => "mock_exam",
    }
}

text_enum! {
    /// Exam importance of a course, used to weight quota allocation.
    Importance as "importance" {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

impl Default for BloomLevel {
    fn default() -> Self {
        Self::Knowledge
    }
}

impl BloomLevel {
    /// One level easier, bottoming out at [`BloomLevel::Knowledge`].
    pub const fn lower(self) -> Self {
        match self {
            Self::Analysis => Self::Application,
            Self::Application | Self::Knowledge => Self::Knowledge,
        }
    }
}

impl Default for QuestionUsage {
    fn default() -> Self {
        Self::Training
    }
}

/// Per-learner shelf state of one question.
///
/// `next_review_session` is `None` exactly when `status` is [`ShelfStatus::Active`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStatus {
    /// Current shelf.
    pub status: ShelfStatus,
    /// Mastery momentum: +1.0 per fast correct answer, +0.5 per slow one.
    pub consecutive_success: f64,
    /// Wrong or blank answers in a row, reset by a correct one.
    pub consecutive_fails: u32,
    /// Session counter value at which the question is due again.
    pub next_review_session: Option<u32>,
}

impl Default for QuestionStatus {
    fn default() -> Self {
        Self {
            status: ShelfStatus::Active,
            consecutive_success: 0.0,
            consecutive_fails: 0,
            next_review_session: None,
        }
    }
}

impl QuestionStatus {
    /// Whether this question has been attempted before and is inside a review cycle.
    pub fn is_repeated(&self) -> bool {
        self.consecutive_fails > 0 || self.consecutive_success > 0.0
    }
}

/// Per-learner mastery of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMastery {
    /// Topic this row belongs to.
    pub topic_id: Uuid,
    /// Always within `0..=100`.
    pub mastery_score: i32,
    /// Session counter value of the last answer in this topic.
    pub last_reviewed_session: u32,
    /// Training answers given in this topic, repeats included.
    pub total_questions_seen: u32,
}

impl TopicMastery {
    /// Empty mastery row for a topic the learner has never touched.
    pub const fn new(topic_id: Uuid) -> Self {
        Self {
            topic_id,
            mastery_score: 0,
            last_reviewed_session: 0,
            total_questions_seen: 0,
        }
    }
}

/// Read-only question metadata supplied by the content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    /// Question this metadata describes.
    pub question_id: Uuid,
    /// Owning topic, `None` for questions not tied to one.
    pub topic_id: Option<Uuid>,
    /// Difficulty tag, `None` when the source did not assign one.
    pub bloom_level: Option<BloomLevel>,
    /// Concept the question tests, if known.
    pub concept_title: Option<String>,
    /// What the question was generated for.
    #[serde(default)]
    pub usage: QuestionUsage,
    /// Set for follow-up questions generated after a failure on the parent.
    pub parent_question_id: Option<Uuid>,
}

/// Topic content metadata used by the time budget and the quota allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMeta {
    /// Topic this metadata describes.
    pub topic_id: Uuid,
    /// Length of the topic's study text in characters.
    pub char_count: usize,
    /// Number of concepts in the topic's concept map, if one was extracted.
    pub concept_count: Option<u32>,
    /// Difficulty on a 1-5 scale, if known.
    pub difficulty_index: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!(ShelfStatus::PendingFollowup.as_str(), "pending_followup");
        assert_eq!(
            "pending_followup".parse::<ShelfStatus>(),
            Ok(ShelfStatus::PendingFollowup)
        );
        assert_eq!("mock_exam".parse::<QuestionUsage>(), Ok(QuestionUsage::MockExam));
        assert_eq!(Importance::Low.to_string(), "low");
    }

    #[test]
    fn test_unknown_text_is_rejected() {
        let err = "retired".parse::<ShelfStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown shelf status: 'retired'");
        assert!("".parse::<BloomLevel>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ShelfStatus::PendingFollowup).unwrap();
        assert_eq!(json, "\"pending_followup\"");
    }

    #[test]
    fn test_is_repeated() {
        assert!(!QuestionStatus::default().is_repeated());

        let failed = QuestionStatus {
            consecutive_fails: 1,
            ..QuestionStatus::default()
        };
        assert!(failed.is_repeated());

        let half = QuestionStatus {
            consecutive_success: 0.5,
            ..QuestionStatus::default()
        };
        assert!(half.is_repeated());
    }

    #[test]
    fn test_bloom_lower_steps_down_once() {
        assert_eq!(BloomLevel::Analysis.lower(), BloomLevel::Application);
        assert_eq!(BloomLevel::Application.lower(), BloomLevel::Knowledge);
        assert_eq!(BloomLevel::Knowledge.lower(), BloomLevel::Knowledge);
    }
}
