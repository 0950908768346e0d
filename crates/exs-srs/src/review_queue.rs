//! Waterfall review queue.
//!
//! A session's queue drains four tiers in order, each skipping questions an
//! earlier tier already took:
//!
//! 1. follow-ups whose review session has come (priority 1)
//! 2. freshly generated follow-up questions nobody has answered yet (priority 1)
//! 3. training questions from the effective topic, then from weak topics (priority 2)
//! 4. archived questions due for a refresh (priority 3)
//!
//! Due follow-ups go first so new content never starves spaced repetition.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{score::MASTERY_THRESHOLD, types::ShelfStatus};

/// Priority of due and new follow-ups.
pub const PRIORITY_FOLLOWUP: u8 = 1;
/// Priority of training questions.
pub const PRIORITY_TRAINING: u8 = 2;
/// Priority of archive refreshes.
pub const PRIORITY_ARCHIVE: u8 = 3;

/// Learner, course and current session the queue is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub session_number: u32,
}

/// One queued question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub question_id: Uuid,
    pub topic_id: Uuid,
    pub course_id: Uuid,
    pub status: ShelfStatus,
    pub priority: u8,
}

/// Stored shelf row of one question for the learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub question_id: Uuid,
    pub topic_id: Uuid,
    pub status: ShelfStatus,
    pub next_review_session: Option<u32>,
}

/// A question of the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuestion {
    pub question_id: Uuid,
    pub topic_id: Uuid,
    /// Set on follow-up questions generated for a failed parent.
    pub parent_question_id: Option<Uuid>,
}

/// The learner's mastery row of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicActivity {
    pub topic_id: Uuid,
    pub mastery_score: i32,
    pub last_touched: DateTime<Utc>,
}

/// Everything the builder reads, loaded by the caller in one go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Shelf rows of the learner for this course, least recently updated first.
    pub statuses: Vec<StatusEntry>,
    /// Questions of the course, in course order.
    pub questions: Vec<CandidateQuestion>,
    /// Mastery rows of the learner for this course.
    pub topics: Vec<TopicActivity>,
}

/// Per-tier caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub followups: usize,
    pub new_followups: usize,
    pub training: usize,
    pub archive: usize,
}

impl TierLimits {
    /// Regular session: 20% follow-ups, 70% training, 10% archive, rounded up.
    pub const fn for_limit(limit: usize) -> Self {
        Self {
            followups: percent_ceil(limit, 20),
            new_followups: percent_ceil(limit, 20),
            training: percent_ceil(limit, 70),
            archive: percent_ceil(limit, 10),
        }
    }

    /// Single-topic drill: caps high enough to cover the topic fully.
    pub const fn exhaustive() -> Self {
        Self {
            followups: 100,
            new_followups: 50,
            training: 1000,
            archive: 100,
        }
    }
}

const fn percent_ceil(limit: usize, percent: usize) -> usize {
    (limit * percent).div_ceil(100)
}

/// Most recently touched topic, the one the learner is currently working on.
pub fn frontier_topic(topics: &[TopicActivity]) -> Option<Uuid> {
    topics
        .iter()
        .fold(None::<&TopicActivity>, |best, topic| match best {
            Some(b) if b.last_touched >= topic.last_touched => Some(b),
            _ => Some(topic),
        })
        .map(|t| t.topic_id)
}

/// Build the review queue for one session.
///
/// # Arguments
///
/// * `ctx` - Learner, course and current session number
/// * `snapshot` - Stored rows the tiers are drawn from
/// * `limit` - Target queue length
/// * `target_topic` - Topic chosen by the learner; relaxes tier caps and disables truncation
pub fn build_review_queue(
    ctx: &SessionContext,
    snapshot: &QueueSnapshot,
    limit: usize,
    target_topic: Option<Uuid>,
) -> Vec<ReviewItem> {
    let limits = if target_topic.is_some() {
        TierLimits::exhaustive()
    } else {
        TierLimits::for_limit(limit)
    };

    let mut queue = QueueBuilder::new(ctx.course_id);
    let session = ctx.session_number;

    // Tier 1: due follow-ups
    queue.take(
        snapshot
            .statuses
            .iter()
            .filter(|s| s.status == ShelfStatus::PendingFollowup && is_due(s, session))
            .map(|s| (s.question_id, s.topic_id)),
        ShelfStatus::PendingFollowup,
        PRIORITY_FOLLOWUP,
        limits.followups,
    );

    // Tier 2: new follow-up questions without a status row
    let new_followup_cap = if target_topic.is_some() {
        limits.new_followups
    } else {
        limits.new_followups.saturating_sub(queue.len())
    };
    let answered: HashSet<Uuid> = snapshot.statuses.iter().map(|s| s.question_id).collect();
    queue.take(
        snapshot
            .questions
            .iter()
            .filter(|q| q.parent_question_id.is_some() && !answered.contains(&q.question_id))
            .map(|q| (q.question_id, q.topic_id)),
        ShelfStatus::PendingFollowup,
        PRIORITY_FOLLOWUP,
        new_followup_cap,
    );

    // Tier 3: training waterfall
    let effective_topic = target_topic
        .or_else(|| frontier_topic(&snapshot.topics))
        .or_else(|| snapshot.questions.first().map(|q| q.topic_id));
    if let Some(effective_topic) = effective_topic {
        let training = waterfall_topics(effective_topic, &snapshot.topics)
            .into_iter()
            .flat_map(|topic_id| training_candidates(topic_id, snapshot, &answered));
        queue.take(
            training,
            ShelfStatus::Active,
            PRIORITY_TRAINING,
            limits.training,
        );
    }

    // Tier 4: archive refreshes
    queue.take(
        snapshot
            .statuses
            .iter()
            .filter(|s| s.status == ShelfStatus::Archived && is_due(s, session))
            .map(|s| (s.question_id, s.topic_id)),
        ShelfStatus::Archived,
        PRIORITY_ARCHIVE,
        limits.archive,
    );

    let mut items = queue.into_items();
    if target_topic.is_none() {
        items.truncate(limit);
    }
    items
}

fn is_due(entry: &StatusEntry, session: u32) -> bool {
    entry.next_review_session.is_none_or(|next| next <= session)
}

/// Effective topic first, then weak topics most recently touched first.
fn waterfall_topics(effective_topic: Uuid, topics: &[TopicActivity]) -> Vec<Uuid> {
    let mut weak: Vec<&TopicActivity> = topics
        .iter()
        .filter(|t| t.topic_id != effective_topic && t.mastery_score < MASTERY_THRESHOLD)
        .collect();
    weak.sort_by(|a, b| b.last_touched.cmp(&a.last_touched));

    std::iter::once(effective_topic)
        .chain(weak.into_iter().map(|t| t.topic_id))
        .collect()
}

/// Active rows of a topic, then its questions the learner has never answered.
fn training_candidates<'a>(
    topic_id: Uuid,
    snapshot: &'a QueueSnapshot,
    answered: &'a HashSet<Uuid>,
) -> impl Iterator<Item = (Uuid, Uuid)> + 'a {
    let active = snapshot
        .statuses
        .iter()
        .filter(move |s| s.topic_id == topic_id && s.status == ShelfStatus::Active)
        .map(|s| (s.question_id, s.topic_id));
    let unseen = snapshot
        .questions
        .iter()
        .filter(move |q| q.topic_id == topic_id && !answered.contains(&q.question_id))
        .map(|q| (q.question_id, q.topic_id));
    active.chain(unseen)
}

struct QueueBuilder {
    course_id: Uuid,
    items: Vec<ReviewItem>,
    used: HashSet<Uuid>,
}

impl QueueBuilder {
    fn new(course_id: Uuid) -> Self {
        Self {
            course_id,
            items: Vec::new(),
            used: HashSet::new(),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    /// Append up to `cap` questions not already queued.
    fn take(
        &mut self,
        candidates: impl IntoIterator<Item = (Uuid, Uuid)>,
        status: ShelfStatus,
        priority: u8,
        cap: usize,
    ) {
        let mut added = 0;
        for (question_id, topic_id) in candidates {
            if added >= cap {
                break;
            }
            if self.used.insert(question_id) {
                self.items.push(ReviewItem {
                    question_id,
                    topic_id,
                    course_id: self.course_id,
                    status,
                    priority,
                });
                added += 1;
            }
        }
    }

    fn into_items(self) -> Vec<ReviewItem> {
        self.items
    }
}
