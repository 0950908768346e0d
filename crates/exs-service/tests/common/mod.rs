use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use exs_db::{MemoryKeyValueStore, MemoryStore, NewQuestion, StudyStore};
use exs_service::{
    ContentError, ContentSource, GeneratedQuestion, GenerationRequest, ServiceConfig, ServiceState,
};
use exs_srs::{BloomLevel, QuestionUsage, TopicMeta};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Content source that replays scripted failures, then generates valid batches.
#[derive(Default)]
pub struct ScriptedContent {
    failures: Mutex<VecDeque<ContentError>>,
    requests: Mutex<Vec<GenerationRequest>>,
    pub calls: AtomicU32,
}

impl ScriptedContent {
    pub fn failing_with(errors: impl IntoIterator<Item = ContentError>) -> Self {
        Self {
            failures: Mutex::new(errors.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ContentSource for ScriptedContent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedQuestion>, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }

        Ok((0..request.count)
            .map(|i| GeneratedQuestion {
                topic_id: request.topic_id,
                concept_title: format!("Concept {i}"),
                bloom_level: BloomLevel::Application,
                prompt: format!("Generated question {i}"),
                options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
                correct_option: 1,
            })
            .collect())
    }
}

/// Service state over in-memory backends.
pub struct TestEnv {
    pub state: ServiceState,
    pub store: MemoryStore,
    pub content: Arc<ScriptedContent>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_content(ScriptedContent::default())
    }

    pub fn with_content(content: ScriptedContent) -> Self {
        Self::with_config(ServiceConfig::with_database_url("postgres://unused"), content)
    }

    pub fn with_config(config: ServiceConfig, content: ScriptedContent) -> Self {
        let store = MemoryStore::new();
        let content = Arc::new(content);
        let state = ServiceState::new(
            config,
            Arc::new(store.clone()),
            Arc::new(MemoryKeyValueStore::new()),
            content.clone(),
        );
        Self {
            state,
            store,
            content,
        }
    }

    /// Add a topic with `questions` training questions to a course.
    pub async fn seed_topic(&self, course_id: Uuid, questions: usize) -> (TopicMeta, Vec<Uuid>) {
        let topic = TopicMeta {
            topic_id: Uuid::new_v4(),
            char_count: 1_560,
            concept_count: Some(4),
            difficulty_index: Some(3.0),
        };
        self.store.add_topic(course_id, topic.clone()).await;

        let rows: Vec<NewQuestion> = (0..questions)
            .map(|_| question(course_id, topic.topic_id, QuestionUsage::Training))
            .collect();
        self.store
            .save_questions(&rows)
            .await
            .expect("Failed to seed questions");

        (topic, rows.iter().map(|q| q.question_id).collect())
    }
}

pub fn question(course_id: Uuid, topic_id: Uuid, usage: QuestionUsage) -> NewQuestion {
    NewQuestion {
        question_id: Uuid::new_v4(),
        course_id,
        topic_id,
        usage,
        bloom_level: BloomLevel::Knowledge,
        concept_title: "Federalism".to_string(),
        prompt: "Which level of government prints money?".to_string(),
        options: vec!["Federal".to_string(), "State".to_string()],
        correct_option: 0,
        parent_question_id: None,
    }
}
