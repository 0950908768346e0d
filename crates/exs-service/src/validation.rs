//! Input checks for answers coming from the outer service.

use exs_srs::ResponseType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::ServiceError;

/// Longest time an answer may report, one hour.
pub const MAX_TIME_SPENT_MS: u64 = 3_600_000;

/// Highest option index a multiple-choice question can have.
pub const MAX_OPTION_INDEX: u32 = 9;

/// One answer submitted by a learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResponseSubmission {
    #[validate(custom(function = "not_nil"))]
    pub user_id: Uuid,
    #[validate(custom(function = "not_nil"))]
    pub course_id: Uuid,
    #[validate(custom(function = "not_nil"))]
    pub question_id: Uuid,
    /// Overrides the question's own topic when set
    pub topic_id: Option<Uuid>,
    pub response: ResponseType,
    #[validate(range(max = 3_600_000))]
    pub time_spent_ms: u64,
    #[validate(range(max = 9))]
    pub selected_answer: Option<u32>,
    #[validate(range(min = 1))]
    pub session_number: u32,
}

fn not_nil(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("nil_uuid"));
    }
    Ok(())
}

/// Validate a submission, including the cross-field rule that blank answers
/// carry no selected option.
pub fn validate_submission(submission: &ResponseSubmission) -> Result<(), ServiceError> {
    submission.validate()?;

    if submission.response == ResponseType::Blank && submission.selected_answer.is_some() {
        return Err(ServiceError::Validation(
            "A blank answer cannot select an option".to_string(),
        ));
    }

    Ok(())
}
