//! Session ordinal per learner and course, and end-of-session tallies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::ResponseType;

/// Monotonic session ordinal. Scheduling measures time in these sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounter {
    /// Always at least 1.
    pub current_session: u32,
    pub last_session_date: NaiveDate,
}

/// Result of activating a course on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionActivation {
    pub counter: SessionCounter,
    /// Whether this activation opened a new session.
    pub is_new_session: bool,
}

impl SessionActivation {
    /// The very first session of a course has a capped intake.
    pub const fn is_first_session(&self) -> bool {
        self.counter.current_session == 1
    }
}

impl SessionCounter {
    /// Counter for a course activated for the first time.
    pub const fn first(today: NaiveDate) -> Self {
        Self {
            current_session: 1,
            last_session_date: today,
        }
    }
}

/// Activate a course for `today`.
///
/// A different calendar day opens the next session; the same day keeps the
/// current one. The ordinal never goes down.
pub fn activate_session(existing: Option<&SessionCounter>, today: NaiveDate) -> SessionActivation {
    match existing {
        None => SessionActivation {
            counter: SessionCounter::first(today),
            is_new_session: true,
        },
        Some(counter) if counter.last_session_date == today => SessionActivation {
            counter: counter.clone(),
            is_new_session: false,
        },
        Some(counter) => SessionActivation {
            counter: SessionCounter {
                current_session: counter.current_session.max(1).saturating_add(1),
                last_session_date: today,
            },
            is_new_session: true,
        },
    }
}

/// Running answer counts for one quiz session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
    pub correct: u32,
    pub incorrect: u32,
    pub blank: u32,
    pub total_time_ms: u64,
}

impl SessionTally {
    /// Count one answer.
    pub const fn record(&mut self, response: ResponseType, time_ms: u64) {
        match response {
            ResponseType::Correct => self.correct += 1,
            ResponseType::Incorrect => self.incorrect += 1,
            ResponseType::Blank => self.blank += 1,
        }
        self.total_time_ms = self.total_time_ms.saturating_add(time_ms);
    }

    /// Answers recorded so far, blanks included.
    pub const fn answered(&self) -> u32 {
        self.correct + self.incorrect + self.blank
    }

    /// Summarize the session.
    pub fn summary(&self) -> SessionSummary {
        let total = self.answered();
        let (percentage, mastery_score) = if total > 0 {
            let total = f64::from(total);
            let percentage = (f64::from(self.correct) / total * 100.0).round() as u32;
            let weighted = f64::from(self.incorrect).mul_add(0.2, f64::from(self.correct));
            (percentage, (weighted / total * 100.0).round() as u32)
        } else {
            (0, 0)
        };

        SessionSummary {
            percentage,
            mastery_score,
            pending_review: self.incorrect + self.blank,
            total_time: format_duration(self.total_time_ms),
        }
    }
}

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Share of correct answers, 0-100.
    pub percentage: u32,
    /// Correct answers plus partial credit for attempted wrong ones, 0-100.
    pub mastery_score: u32,
    /// Answers that put a question back into follow-up.
    pub pending_review: u32,
    /// `HH:MM:SS`
    pub total_time: String,
}

fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    format!("{hours:02}:{minutes:02}:{:02}", seconds % 60)
}
