//! In-memory backend, useful for testing and single-process tools.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use exs_srs::{
    QuestionMeta, QuestionStatus, QuestionUsage, QueueSnapshot, SessionActivation, SessionCounter,
    ShelfStatus, TopicMastery, TopicMeta, activate_session,
    review_queue::{CandidateQuestion, StatusEntry, TopicActivity},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{NewQuestion, ProgressRecord},
    store::StudyStore,
};

#[derive(Debug)]
struct StatusRow {
    status: QuestionStatus,
    /// Write order, stands in for `updated_at`.
    updated: u64,
}

#[derive(Debug)]
struct MasteryRow {
    course_id: Uuid,
    mastery: TopicMastery,
    touched: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    /// `(course_id, topic)` in syllabus order
    topics: Vec<(Uuid, TopicMeta)>,
    /// Insertion order
    questions: Vec<NewQuestion>,
    statuses: HashMap<(Uuid, Uuid), StatusRow>,
    mastery: HashMap<(Uuid, Uuid), MasteryRow>,
    counters: HashMap<(Uuid, Uuid), SessionCounter>,
    progress: Vec<ProgressRecord>,
    writes: u64,
    last_touch: Option<DateTime<Utc>>,
}

impl Tables {
    fn next_write(&mut self) -> u64 {
        self.writes += 1;
        self.writes
    }

    /// Strictly increasing timestamps, so two saves never tie on recency.
    fn next_touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let touch = match self.last_touch {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_touch = Some(touch);
        touch
    }

    fn question(&self, question_id: Uuid) -> Option<&NewQuestion> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    fn topic_position(&self, topic_id: Uuid) -> usize {
        self.topics
            .iter()
            .position(|(_, t)| t.topic_id == topic_id)
            .unwrap_or(usize::MAX)
    }
}

/// A [`StudyStore`] that keeps every table in process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a topic to the end of a course's syllabus.
    pub async fn add_topic(&self, course_id: Uuid, topic: TopicMeta) {
        let mut tables = self.tables.write().await;
        tables.topics.retain(|(_, t)| t.topic_id != topic.topic_id);
        tables.topics.push((course_id, topic));
    }

    /// Progress log of a learner, oldest first.
    pub async fn progress(&self, user_id: Uuid) -> Vec<ProgressRecord> {
        self.tables
            .read()
            .await
            .progress
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StudyStore for MemoryStore {
    async fn question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<QuestionStatus>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .statuses
            .get(&(user_id, question_id))
            .map(|row| row.status.clone()))
    }

    async fn save_question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        status: &QuestionStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let updated = tables.next_write();
        tables.statuses.insert(
            (user_id, question_id),
            StatusRow {
                status: status.clone(),
                updated,
            },
        );
        Ok(())
    }

    async fn question_meta(&self, question_id: Uuid) -> Result<Option<QuestionMeta>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.question(question_id).map(NewQuestion::meta))
    }

    async fn topic_meta(&self, topic_id: Uuid) -> Result<Option<TopicMeta>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .topics
            .iter()
            .find(|(_, t)| t.topic_id == topic_id)
            .map(|(_, t)| t.clone()))
    }

    async fn topic_mastery(
        &self,
        user_id: Uuid,
        topic_id: Uuid,
    ) -> Result<Option<TopicMastery>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .mastery
            .get(&(user_id, topic_id))
            .map(|row| row.mastery.clone()))
    }

    async fn save_topic_mastery(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        mastery: &TopicMastery,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let touched = tables.next_touch();
        tables.mastery.insert(
            (user_id, mastery.topic_id),
            MasteryRow {
                course_id,
                mastery: mastery.clone(),
                touched,
            },
        );
        Ok(())
    }

    async fn unique_solved_in_topic(&self, user_id: Uuid, topic_id: Uuid) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        let solved = tables
            .statuses
            .iter()
            .filter(|((user, question_id), row)| {
                *user == user_id
                    && row.status.status != ShelfStatus::Active
                    && tables
                        .question(*question_id)
                        .is_some_and(|q| q.topic_id == topic_id)
            })
            .count();
        Ok(u32::try_from(solved).unwrap_or(u32::MAX))
    }

    async fn topic_question_count(&self, topic_id: Uuid) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .questions
            .iter()
            .filter(|q| q.topic_id == topic_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn topic_concepts(&self, topic_id: Uuid) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let mut concepts: Vec<String> = Vec::new();
        for question in tables.questions.iter().filter(|q| q.topic_id == topic_id) {
            if !concepts.contains(&question.concept_title) {
                concepts.push(question.concept_title.clone());
            }
        }
        Ok(concepts)
    }

    async fn record_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.tables.write().await.progress.push(record.clone());
        Ok(())
    }

    async fn session_counter(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<SessionCounter>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.counters.get(&(user_id, course_id)).cloned())
    }

    async fn activate_session(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        today: NaiveDate,
    ) -> Result<SessionActivation, StoreError> {
        let mut tables = self.tables.write().await;
        let activation = activate_session(tables.counters.get(&(user_id, course_id)), today);
        tables
            .counters
            .insert((user_id, course_id), activation.counter.clone());
        Ok(activation)
    }

    async fn queue_snapshot(&self, user_id: Uuid, course_id: Uuid) -> Result<QueueSnapshot, StoreError> {
        let tables = self.tables.read().await;

        let mut statuses: Vec<(u64, StatusEntry)> = tables
            .statuses
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .filter_map(|((_, question_id), row)| {
                let question = tables.question(*question_id)?;
                (question.course_id == course_id && question.usage == QuestionUsage::Training).then(|| {
                    (
                        row.updated,
                        StatusEntry {
                            question_id: *question_id,
                            topic_id: question.topic_id,
                            status: row.status.status,
                            next_review_session: row.status.next_review_session,
                        },
                    )
                })
            })
            .collect();
        statuses.sort_by_key(|(updated, _)| *updated);

        let mut questions: Vec<(usize, usize, CandidateQuestion)> = tables
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.course_id == course_id && q.usage == QuestionUsage::Training)
            .map(|(index, q)| {
                (
                    tables.topic_position(q.topic_id),
                    index,
                    CandidateQuestion {
                        question_id: q.question_id,
                        topic_id: q.topic_id,
                        parent_question_id: q.parent_question_id,
                    },
                )
            })
            .collect();
        questions.sort_by_key(|(position, index, _)| (*position, *index));

        let topics = tables
            .mastery
            .iter()
            .filter(|((user, _), row)| *user == user_id && row.course_id == course_id)
            .map(|(_, row)| TopicActivity {
                topic_id: row.mastery.topic_id,
                mastery_score: row.mastery.mastery_score,
                last_touched: row.touched,
            })
            .collect();

        Ok(QueueSnapshot {
            statuses: statuses.into_iter().map(|(_, entry)| entry).collect(),
            questions: questions.into_iter().map(|(_, _, q)| q).collect(),
            topics,
        })
    }

    async fn course_topics(&self, course_id: Uuid) -> Result<Vec<TopicMeta>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .topics
            .iter()
            .filter(|(course, _)| *course == course_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn course_mastery(&self, user_id: Uuid, course_id: Uuid) -> Result<Vec<TopicMastery>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .mastery
            .iter()
            .filter(|((user, _), row)| *user == user_id && row.course_id == course_id)
            .map(|(_, row)| row.mastery.clone())
            .collect())
    }

    async fn questions_for_usage(
        &self,
        topic_id: Uuid,
        usage: QuestionUsage,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.topic_id == topic_id && q.usage == usage)
            .map(|q| q.question_id)
            .take(limit)
            .collect())
    }

    async fn save_questions(&self, questions: &[NewQuestion]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for question in questions {
            if tables.question(question.question_id).is_none() {
                tables.questions.push(question.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exs_srs::BloomLevel;

    fn topic(char_count: usize) -> TopicMeta {
        TopicMeta {
            topic_id: Uuid::new_v4(),
            char_count,
            concept_count: Some(4),
            difficulty_index: None,
        }
    }

    fn question(course_id: Uuid, topic_id: Uuid, usage: QuestionUsage) -> NewQuestion {
        NewQuestion {
            question_id: Uuid::new_v4(),
            course_id,
            topic_id,
            usage,
            bloom_level: BloomLevel::Knowledge,
            concept_title: "Checks and balances".to_string(),
            prompt: "Which branch can veto a bill?".to_string(),
            options: vec!["Executive".to_string(), "Judicial".to_string()],
            correct_option: 0,
            parent_question_id: None,
        }
    }

    fn pending(next: u32) -> QuestionStatus {
        QuestionStatus {
            status: ShelfStatus::PendingFollowup,
            consecutive_success: 1.0,
            consecutive_fails: 0,
            next_review_session: Some(next),
        }
    }

    #[tokio::test]
    async fn test_activation_persists_counter() {
        let store = MemoryStore::new();
        let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
        let day = |d| NaiveDate::from_ymd_opt(2026, 5, d).unwrap();

        let first = store.activate_session(user, course, day(1)).await.unwrap();
        assert_eq!(first.counter.current_session, 1);

        let again = store.activate_session(user, course, day(1)).await.unwrap();
        assert!(!again.is_new_session);

        let next = store.activate_session(user, course, day(2)).await.unwrap();
        assert_eq!(next.counter.current_session, 2);
        assert_eq!(
            store.session_counter(user, course).await.unwrap(),
            Some(next.counter)
        );
    }

    #[tokio::test]
    async fn test_unique_solved_counts_non_active_rows_of_topic() {
        let store = MemoryStore::new();
        let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
        let (a, b) = (topic(500), topic(900));
        store.add_topic(course, a.clone()).await;
        store.add_topic(course, b.clone()).await;

        let q1 = question(course, a.topic_id, QuestionUsage::Training);
        let q2 = question(course, a.topic_id, QuestionUsage::Training);
        let q3 = question(course, b.topic_id, QuestionUsage::Training);
        store
            .save_questions(&[q1.clone(), q2.clone(), q3.clone()])
            .await
            .unwrap();

        store
            .save_question_status(user, q1.question_id, &pending(3))
            .await
            .unwrap();
        store
            .save_question_status(user, q2.question_id, &QuestionStatus::default())
            .await
            .unwrap();
        store
            .save_question_status(user, q3.question_id, &pending(4))
            .await
            .unwrap();

        assert_eq!(store.unique_solved_in_topic(user, a.topic_id).await.unwrap(), 1);
        assert_eq!(store.topic_question_count(a.topic_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_ordering() {
        let store = MemoryStore::new();
        let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
        let (first, second) = (topic(100), topic(200));
        store.add_topic(course, first.clone()).await;
        store.add_topic(course, second.clone()).await;

        // Inserted out of syllabus order
        let late = question(course, second.topic_id, QuestionUsage::Training);
        let early = question(course, first.topic_id, QuestionUsage::Training);
        let mock = question(course, first.topic_id, QuestionUsage::MockExam);
        store
            .save_questions(&[late.clone(), early.clone(), mock.clone()])
            .await
            .unwrap();

        store
            .save_question_status(user, early.question_id, &pending(2))
            .await
            .unwrap();
        store
            .save_question_status(user, late.question_id, &pending(2))
            .await
            .unwrap();
        // Mock-exam answers leave a row too, but never reach the snapshot
        store
            .save_question_status(user, mock.question_id, &QuestionStatus::default())
            .await
            .unwrap();
        store
            .save_topic_mastery(user, course, &TopicMastery::new(first.topic_id))
            .await
            .unwrap();
        store
            .save_topic_mastery(user, course, &TopicMastery::new(second.topic_id))
            .await
            .unwrap();

        let snapshot = store.queue_snapshot(user, course).await.unwrap();

        let statuses: Vec<_> = snapshot.statuses.iter().map(|s| s.question_id).collect();
        assert_eq!(statuses, vec![early.question_id, late.question_id]);

        let questions: Vec<_> = snapshot.questions.iter().map(|q| q.question_id).collect();
        assert_eq!(questions, vec![early.question_id, late.question_id]);

        assert_eq!(
            exs_srs::review_queue::frontier_topic(&snapshot.topics),
            Some(second.topic_id)
        );
    }

    #[tokio::test]
    async fn test_topic_concepts_are_distinct_in_insertion_order() {
        let store = MemoryStore::new();
        let course = Uuid::new_v4();
        let t = topic(100);
        let mut first = question(course, t.topic_id, QuestionUsage::Training);
        first.concept_title = "Separation of powers".to_string();
        let second = question(course, t.topic_id, QuestionUsage::Archive);
        let repeat = question(course, t.topic_id, QuestionUsage::MockExam);
        let other_topic = question(course, Uuid::new_v4(), QuestionUsage::Training);
        store
            .save_questions(&[first, second, repeat, other_topic])
            .await
            .unwrap();

        assert_eq!(
            store.topic_concepts(t.topic_id).await.unwrap(),
            vec!["Separation of powers".to_string(), "Checks and balances".to_string()]
        );
        assert!(store.topic_concepts(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_questions_for_usage() {
        let store = MemoryStore::new();
        let course = Uuid::new_v4();
        let t = topic(100);
        store.add_topic(course, t.clone()).await;
        let mocks: Vec<_> = (0..3)
            .map(|_| question(course, t.topic_id, QuestionUsage::MockExam))
            .collect();
        store.save_questions(&mocks).await.unwrap();
        store
            .save_questions(&[question(course, t.topic_id, QuestionUsage::Training)])
            .await
            .unwrap();

        let ids = store
            .questions_for_usage(t.topic_id, QuestionUsage::MockExam, 2)
            .await
            .unwrap();
        assert_eq!(ids, vec![mocks[0].question_id, mocks[1].question_id]);
    }
}
