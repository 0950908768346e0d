//! Decision core for exam-shelf practice sessions.
//!
//! This crate decides, for each learner and question, whether the question was
//! mastered, when it should come back, and how a fixed-size exam is split
//! across topics. Everything here is a pure function over snapshots: callers
//! load rows, call in, and persist what comes back.
//!
//! * [`time_budget`] - expected answer time and fast/slow classification
//! * [`shelf`] - `active -> pending_followup -> archived` transitions and review gaps
//! * [`score`] - score deltas, blended mastery and the bloom/time weighted score
//! * [`submission`] - the full per-answer pipeline
//! * [`review_queue`] - the four-tier waterfall queue of a session
//! * [`quota`] - largest-remainder exam allocation
//! * [`session`] - the session ordinal and end-of-session tallies

pub mod quota;
pub mod review_queue;
pub mod score;
pub mod session;
pub mod shelf;
pub mod submission;
pub mod time_budget;
pub mod types;

pub use quota::{TopicMetrics, TopicQuota, allocate_quotas};
pub use review_queue::{QueueSnapshot, ReviewItem, SessionContext, build_review_queue};
pub use session::{SessionActivation, SessionCounter, SessionSummary, SessionTally, activate_session};
pub use submission::{SubmissionInput, SubmissionResult, submit_response};
pub use time_budget::time_budget_ms;
pub use types::{
    BloomLevel, Importance, ParseError, QuestionMeta, QuestionStatus, QuestionUsage, ResponseType,
    ShelfStatus, TopicMastery, TopicMeta,
};
