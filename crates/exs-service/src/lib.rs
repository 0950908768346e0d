//! Orchestration around the exam-shelf decision core.
//!
//! Operations load snapshots from a [`exs_db::StudyStore`], call the pure
//! functions in [`exs_srs`], and persist what comes back. An outer service
//! (HTTP, jobs, CLI) owns transport and authentication and calls in here.

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod exam;
pub mod generation;
pub mod metrics;
pub mod pool;
pub mod practice;
pub mod retry;
pub mod session;
pub mod state;
pub mod tracing;
pub mod validation;

pub use config::{Environment, ServiceConfig};
pub use content::{ContentError, ContentSource, FollowUpTarget, GeneratedQuestion, GenerationRequest};
pub use error::ServiceError;
pub use exam::{ExamPlan, ExamSection, compose_exam};
pub use generation::{generate_follow_up, generate_questions, replenish_topic};
pub use practice::{AnswerOutcome, submit_response};
pub use session::{QuizSession, build_session_queue, finish_session, resume_session, start_session};
pub use state::ServiceState;
pub use validation::ResponseSubmission;
