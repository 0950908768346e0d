//! PostgreSQL [`StudyStore`] backed by `sqlx`.
//!
//! Schema lives in this crate's `migrations/`. Enums are stored as text and
//! parsed back on read; counters are `INTEGER` columns and are range-checked
//! on the way in and out.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use exs_srs::{
    QuestionMeta, QuestionStatus, QuestionUsage, QueueSnapshot, SessionActivation, SessionCounter,
    TopicMastery, TopicMeta, activate_session,
    review_queue::{CandidateQuestion, StatusEntry, TopicActivity},
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{NewQuestion, ProgressRecord},
    store::StudyStore,
};

/// [`StudyStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStudyStore {
    pool: PgPool,
}

impl PgStudyStore {
    /// Store backed by `pool`. Migrations must already be applied.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_i32<T: TryInto<i32> + Copy + std::fmt::Display>(value: T, column: &str) -> Result<i32, StoreError> {
    value
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

#[derive(FromRow)]
struct StatusRow {
    status: String,
    consecutive_success: f64,
    consecutive_fails: i32,
    next_review_session: Option<i32>,
}

impl TryFrom<StatusRow> for QuestionStatus {
    type Error = StoreError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            consecutive_success: row.consecutive_success,
            consecutive_fails: to_u32(row.consecutive_fails, "consecutive_fails")?,
            next_review_session: row
                .next_review_session
                .map(|s| to_u32(s, "next_review_session"))
                .transpose()?,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    topic_id: Uuid,
    bloom_level: String,
    concept_title: String,
    usage_type: String,
    parent_question_id: Option<Uuid>,
}

impl TryFrom<QuestionRow> for QuestionMeta {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            question_id: row.id,
            topic_id: Some(row.topic_id),
            bloom_level: Some(row.bloom_level.parse()?),
            concept_title: Some(row.concept_title),
            usage: row.usage_type.parse()?,
            parent_question_id: row.parent_question_id,
        })
    }
}

#[derive(FromRow)]
struct TopicRow {
    id: Uuid,
    char_count: i32,
    concept_count: Option<i32>,
    difficulty_index: Option<f64>,
}

impl TryFrom<TopicRow> for TopicMeta {
    type Error = StoreError;

    fn try_from(row: TopicRow) -> Result<Self, Self::Error> {
        Ok(Self {
            topic_id: row.id,
            char_count: to_u32(row.char_count, "char_count")? as usize,
            concept_count: row
                .concept_count
                .map(|c| to_u32(c, "concept_count"))
                .transpose()?,
            difficulty_index: row.difficulty_index,
        })
    }
}

#[derive(FromRow)]
struct MasteryRow {
    topic_id: Uuid,
    mastery_score: i32,
    last_reviewed_session: i32,
    total_questions_seen: i32,
}

impl TryFrom<MasteryRow> for TopicMastery {
    type Error = StoreError;

    fn try_from(row: MasteryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            topic_id: row.topic_id,
            mastery_score: row.mastery_score,
            last_reviewed_session: to_u32(row.last_reviewed_session, "last_reviewed_session")?,
            total_questions_seen: to_u32(row.total_questions_seen, "total_questions_seen")?,
        })
    }
}

#[derive(FromRow)]
struct CounterRow {
    current_session: i32,
    last_session_date: NaiveDate,
}

impl TryFrom<CounterRow> for SessionCounter {
    type Error = StoreError;

    fn try_from(row: CounterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            current_session: to_u32(row.current_session, "current_session")?,
            last_session_date: row.last_session_date,
        })
    }
}

#[async_trait]
impl StudyStore for PgStudyStore {
    async fn question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<QuestionStatus>, StoreError> {
        let row: Option<StatusRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT status, consecutive_success, consecutive_fails, next_review_session
            FROM user_question_status
            WHERE user_id = $1 AND question_id = $2
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionStatus::try_from).transpose()
    }

    async fn save_question_status(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        status: &QuestionStatus,
    ) -> Result<(), StoreError> {
        let next_review = status
            .next_review_session
            .map(|s| to_i32(s, "next_review_session"))
            .transpose()?;

        sqlx::query(
            // language=PostgreSQL
            r#"
            INSERT INTO user_question_status
                (user_id, question_id, status, consecutive_success, consecutive_fails, next_review_session)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, question_id)
            DO UPDATE SET
                status = $3,
                consecutive_success = $4,
                consecutive_fails = $5,
                next_review_session = $6,
                updated_at = clock_timestamp()
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(status.status.as_str())
        .bind(status.consecutive_success)
        .bind(to_i32(status.consecutive_fails, "consecutive_fails")?)
        .bind(next_review)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn question_meta(&self, question_id: Uuid) -> Result<Option<QuestionMeta>, StoreError> {
        let row: Option<QuestionRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT id, topic_id, bloom_level, concept_title, usage_type, parent_question_id
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestionMeta::try_from).transpose()
    }

    async fn topic_meta(&self, topic_id: Uuid) -> Result<Option<TopicMeta>, StoreError> {
        let row: Option<TopicRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT id, char_count, concept_count, difficulty_index
            FROM topics
            WHERE id = $1
            "#,
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TopicMeta::try_from).transpose()
    }

    async fn topic_mastery(
        &self,
        user_id: Uuid,
        topic_id: Uuid,
    ) -> Result<Option<TopicMastery>, StoreError> {
        let row: Option<MasteryRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT topic_id, mastery_score, last_reviewed_session, total_questions_seen
            FROM topic_mastery
            WHERE user_id = $1 AND topic_id = $2
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TopicMastery::try_from).transpose()
    }

    async fn save_topic_mastery(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        mastery: &TopicMastery,
    ) -> Result<(), StoreError> {
        sqlx::query(
            // language=PostgreSQL
            r#"
            INSERT INTO topic_mastery
                (user_id, topic_id, course_id, mastery_score, last_reviewed_session, total_questions_seen)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, topic_id)
            DO UPDATE SET
                mastery_score = $4,
                last_reviewed_session = $5,
                total_questions_seen = $6,
                updated_at = clock_timestamp()
            "#,
        )
        .bind(user_id)
        .bind(mastery.topic_id)
        .bind(course_id)
        .bind(mastery.mastery_score)
        .bind(to_i32(mastery.last_reviewed_session, "last_reviewed_session")?)
        .bind(to_i32(mastery.total_questions_seen, "total_questions_seen")?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unique_solved_in_topic(&self, user_id: Uuid, topic_id: Uuid) -> Result<u32, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT COUNT(*)
            FROM user_question_status s
            JOIN questions q ON q.id = s.question_id
            WHERE s.user_id = $1
              AND q.topic_id = $2
              AND s.status IN ('archived', 'pending_followup')
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn topic_question_count(&self, topic_id: Uuid) -> Result<u32, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT COUNT(*) FROM questions WHERE topic_id = $1
            "#,
        )
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn topic_concepts(&self, topic_id: Uuid) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT concept_title
            FROM questions
            WHERE topic_id = $1
            GROUP BY concept_title
            ORDER BY MIN(created_at) ASC
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(title,)| title).collect())
    }

    async fn record_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let selected = record
            .selected_answer
            .map(|a| to_i32(a, "selected_answer"))
            .transpose()?;
        let time_spent = i64::try_from(record.time_spent_ms)
            .map_err(|_| StoreError::Corrupt(format!("time_spent_ms out of range: {}", record.time_spent_ms)))?;

        sqlx::query(
            // language=PostgreSQL
            r#"
            INSERT INTO quiz_progress
                (user_id, question_id, topic_id, course_id, response_type,
                 selected_answer, session_number, time_spent_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.user_id)
        .bind(record.question_id)
        .bind(record.topic_id)
        .bind(record.course_id)
        .bind(record.response.as_str())
        .bind(selected)
        .bind(to_i32(record.session_number, "session_number")?)
        .bind(time_spent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn session_counter(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<SessionCounter>, StoreError> {
        let row: Option<CounterRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT current_session, last_session_date
            FROM course_session_counters
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SessionCounter::try_from).transpose()
    }

    async fn activate_session(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        today: NaiveDate,
    ) -> Result<SessionActivation, StoreError> {
        // Row lock serializes concurrent activations of the same course
        let mut tx = self.pool.begin().await?;

        let row: Option<CounterRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT current_session, last_session_date
            FROM course_session_counters
            WHERE user_id = $1 AND course_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;

        let existing = row.map(SessionCounter::try_from).transpose()?;
        let activation = activate_session(existing.as_ref(), today);

        if activation.is_new_session {
            sqlx::query(
                // language=PostgreSQL
                r#"
                INSERT INTO course_session_counters (user_id, course_id, current_session, last_session_date)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, course_id)
                DO UPDATE SET
                    current_session = GREATEST(course_session_counters.current_session, $3),
                    last_session_date = $4,
                    updated_at = NOW()
                "#,
            )
            .bind(user_id)
            .bind(course_id)
            .bind(to_i32(activation.counter.current_session, "current_session")?)
            .bind(activation.counter.last_session_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            %user_id,
            %course_id,
            session = activation.counter.current_session,
            is_new = activation.is_new_session,
            "session activated"
        );

        Ok(activation)
    }

    async fn queue_snapshot(&self, user_id: Uuid, course_id: Uuid) -> Result<QueueSnapshot, StoreError> {
        let statuses: Vec<(Uuid, Uuid, String, Option<i32>)> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT s.question_id, q.topic_id, s.status, s.next_review_session
            FROM user_question_status s
            JOIN questions q ON q.id = s.question_id
            WHERE s.user_id = $1 AND q.course_id = $2 AND q.usage_type = 'training'
            ORDER BY s.updated_at ASC
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let questions: Vec<(Uuid, Uuid, Option<Uuid>)> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT q.id, q.topic_id, q.parent_question_id
            FROM questions q
            JOIN topics t ON t.id = q.topic_id
            WHERE q.course_id = $1 AND q.usage_type = 'training'
            ORDER BY t.position ASC, q.created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let topics: Vec<(Uuid, i32, DateTime<Utc>)> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT topic_id, mastery_score, updated_at
            FROM topic_mastery
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let statuses = statuses
            .into_iter()
            .map(|(question_id, topic_id, status, next)| {
                Ok(StatusEntry {
                    question_id,
                    topic_id,
                    status: status.parse()?,
                    next_review_session: next.map(|s| to_u32(s, "next_review_session")).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(QueueSnapshot {
            statuses,
            questions: questions
                .into_iter()
                .map(|(question_id, topic_id, parent_question_id)| CandidateQuestion {
                    question_id,
                    topic_id,
                    parent_question_id,
                })
                .collect(),
            topics: topics
                .into_iter()
                .map(|(topic_id, mastery_score, last_touched)| TopicActivity {
                    topic_id,
                    mastery_score,
                    last_touched,
                })
                .collect(),
        })
    }

    async fn course_topics(&self, course_id: Uuid) -> Result<Vec<TopicMeta>, StoreError> {
        let rows: Vec<TopicRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT id, char_count, concept_count, difficulty_index
            FROM topics
            WHERE course_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TopicMeta::try_from).collect()
    }

    async fn course_mastery(&self, user_id: Uuid, course_id: Uuid) -> Result<Vec<TopicMastery>, StoreError> {
        let rows: Vec<MasteryRow> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT topic_id, mastery_score, last_reviewed_session, total_questions_seen
            FROM topic_mastery
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TopicMastery::try_from).collect()
    }

    async fn questions_for_usage(
        &self,
        topic_id: Uuid,
        usage: QuestionUsage,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            // language=PostgreSQL
            r#"
            SELECT id
            FROM questions
            WHERE topic_id = $1 AND usage_type = $2
            ORDER BY created_at ASC
            LIMIT $3
            "#,
        )
        .bind(topic_id)
        .bind(usage.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn save_questions(&self, questions: &[NewQuestion]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for question in questions {
            sqlx::query(
                // language=PostgreSQL
                r#"
                INSERT INTO questions
                    (id, course_id, topic_id, usage_type, bloom_level, concept_title,
                     prompt, options, correct_option, parent_question_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(question.question_id)
            .bind(question.course_id)
            .bind(question.topic_id)
            .bind(question.usage.as_str())
            .bind(question.bloom_level.as_str())
            .bind(&question.concept_title)
            .bind(&question.prompt)
            .bind(&question.options)
            .bind(to_i32(question.correct_option, "correct_option")?)
            .bind(question.parent_question_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_row_conversion() {
        let row = StatusRow {
            status: "pending_followup".to_string(),
            consecutive_success: 1.5,
            consecutive_fails: 0,
            next_review_session: Some(12),
        };
        let status = QuestionStatus::try_from(row).unwrap();
        assert_eq!(status.status, exs_srs::ShelfStatus::PendingFollowup);
        assert_eq!(status.next_review_session, Some(12));
    }

    #[test]
    fn test_corrupt_rows_are_rejected() {
        let bad_enum = StatusRow {
            status: "shelved".to_string(),
            consecutive_success: 0.0,
            consecutive_fails: 0,
            next_review_session: None,
        };
        assert!(matches!(
            QuestionStatus::try_from(bad_enum),
            Err(StoreError::Corrupt(_))
        ));

        let negative = CounterRow {
            current_session: -1,
            last_session_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(matches!(
            SessionCounter::try_from(negative),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_out_of_range_writes_are_rejected() {
        assert!(to_i32(u32::MAX, "session_number").is_err());
        assert_eq!(to_i32(42u32, "session_number").unwrap(), 42);
    }
}
