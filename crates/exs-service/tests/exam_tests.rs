use exs_db::StudyStore;
use exs_service::{ContentError, ServiceError, compose_exam, replenish_topic, retry::RetryError};
use exs_srs::{Importance, QuestionUsage, TopicMastery};
use uuid::Uuid;

use crate::common::{ScriptedContent, TestEnv, question};

#[tokio::test]
async fn test_equal_topics_split_evenly_and_get_generated() {
    let env = TestEnv::new();
    let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
    for _ in 0..10 {
        env.seed_topic(course, 2).await;
    }

    let plan = compose_exam(&env.state, user, course, Importance::High, None)
        .await
        .expect("Failed to compose exam");

    assert_eq!(plan.exam_total, 20);
    assert_eq!(plan.sections.len(), 10);
    for section in &plan.sections {
        assert_eq!(section.quota, 2);
        assert_eq!(section.question_ids.len(), 2);
        assert_eq!(section.generated, 2);
        assert_eq!(section.shortfall(), 0);
    }
    assert_eq!(plan.question_ids().count(), 20);
    assert_eq!(env.content.calls(), 10);

    // Second exam reuses the bank
    let again = compose_exam(&env.state, user, course, Importance::High, None)
        .await
        .unwrap();
    assert!(again.sections.iter().all(|s| s.generated == 0));
    assert_eq!(env.content.calls(), 10);
    assert_eq!(
        again.question_ids().collect::<Vec<_>>(),
        plan.question_ids().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_existing_mock_questions_are_used_first() {
    let env = TestEnv::new();
    let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
    let (topic, _) = env.seed_topic(course, 2).await;
    let stocked = question(course, topic.topic_id, QuestionUsage::MockExam);
    env.store.save_questions(&[stocked.clone()]).await.unwrap();

    let plan = compose_exam(&env.state, user, course, Importance::Medium, Some(3))
        .await
        .unwrap();

    let section = &plan.sections[0];
    assert_eq!(section.quota, 3);
    assert_eq!(section.question_ids[0], stocked.question_id);
    assert_eq!(section.generated, 2);
}

#[tokio::test]
async fn test_weak_topics_get_more_questions() {
    let env = TestEnv::new();
    let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
    let (strong, _) = env.seed_topic(course, 2).await;
    let (weak, _) = env.seed_topic(course, 2).await;

    let mastered = TopicMastery {
        mastery_score: 100,
        ..TopicMastery::new(strong.topic_id)
    };
    env.store.save_topic_mastery(user, course, &mastered).await.unwrap();

    let plan = compose_exam(&env.state, user, course, Importance::Low, Some(10))
        .await
        .unwrap();

    assert_eq!(plan.sections[0].topic_id, strong.topic_id);
    assert_eq!(plan.sections[1].topic_id, weak.topic_id);
    assert!(plan.sections[1].quota > plan.sections[0].quota);
    assert_eq!(plan.sections.iter().map(|s| s.quota).sum::<u32>(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_transient_content_failures_are_retried() {
    let env = TestEnv::with_content(ScriptedContent::failing_with([
        ContentError::RateLimited,
        ContentError::Unavailable("timeout".to_string()),
    ]));
    let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
    env.seed_topic(course, 2).await;

    let plan = compose_exam(&env.state, user, course, Importance::High, Some(3))
        .await
        .unwrap();

    assert_eq!(env.content.calls(), 3);
    assert_eq!(plan.sections[0].generated, 3);
    assert_eq!(plan.sections[0].shortfall(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_generation_leaves_a_shortfall() {
    let env = TestEnv::with_content(ScriptedContent::failing_with([ContentError::Rejected(
        "quota exceeded".to_string(),
    )]));
    let (user, course) = (Uuid::new_v4(), Uuid::new_v4());
    env.seed_topic(course, 2).await;

    let plan = compose_exam(&env.state, user, course, Importance::High, Some(4))
        .await
        .expect("Generation failures should not fail the exam");

    assert_eq!(env.content.calls(), 1);
    assert_eq!(plan.sections[0].generated, 0);
    assert_eq!(plan.sections[0].shortfall(), 4);
}

#[tokio::test]
async fn test_course_without_topics() {
    let env = TestEnv::new();
    let plan = compose_exam(&env.state, Uuid::new_v4(), Uuid::new_v4(), Importance::High, None)
        .await
        .unwrap();
    assert!(plan.sections.is_empty());
    assert_eq!(env.content.calls(), 0);
}

#[tokio::test]
async fn test_replenish_topic_fills_generation_targets() {
    let env = TestEnv::new();
    let course = Uuid::new_v4();
    // Four concepts: 5 training, 2 archive, 1 mock exam
    let (topic, _) = env.seed_topic(course, 3).await;

    let added = replenish_topic(&env.state, course, topic.topic_id)
        .await
        .expect("Failed to replenish topic");
    assert_eq!(added.training, 2);
    assert_eq!(added.archive, 2);
    assert_eq!(added.mock_exam, 1);
    assert_eq!(env.store.topic_question_count(topic.topic_id).await.unwrap(), 8);

    let again = replenish_topic(&env.state, course, topic.topic_id).await.unwrap();
    assert_eq!((again.training, again.archive, again.mock_exam), (0, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn test_replenish_topic_reports_content_failure() {
    let env = TestEnv::with_content(ScriptedContent::failing_with([ContentError::Rejected(
        "quota exceeded".to_string(),
    )]));
    let course = Uuid::new_v4();
    let (topic, _) = env.seed_topic(course, 3).await;

    let err = replenish_topic(&env.state, course, topic.topic_id)
        .await
        .unwrap_err();
    match err {
        ServiceError::Content(RetryError::Permanent { attempts, error }) => {
            assert_eq!(attempts, 1);
            assert_eq!(error, ContentError::Rejected("quota exceeded".to_string()));
        }
        other => panic!("Expected a content error, got {other:?}"),
    }
    assert_eq!(env.store.topic_question_count(topic.topic_id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_generation_requests_list_covered_concepts() {
    let env = TestEnv::new();
    let course = Uuid::new_v4();
    let (topic, _) = env.seed_topic(course, 3).await;

    replenish_topic(&env.state, course, topic.topic_id).await.unwrap();

    let requests = env.content.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].usage, QuestionUsage::Training);
    assert_eq!(requests[0].covered_concepts, vec!["Federalism".to_string()]);
    // Later usages see what the training batch added
    assert_eq!(
        requests[1].covered_concepts,
        vec!["Federalism".to_string(), "Concept 0".to_string(), "Concept 1".to_string()]
    );
    assert!(requests.iter().all(|r| r.follow_up.is_none()));
}
