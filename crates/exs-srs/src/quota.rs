//! Exam question budgets per topic.
//!
//! A fixed-length exam is split across topics by weight. Weights favour
//! important courses, weak topics, dense material and long concept maps.
//! Integer shares are derived with largest-remainder rounding so the counts
//! always add up to the exam size.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Importance;

/// Difficulty assumed when a topic has no difficulty index.
pub const DEFAULT_DIFFICULTY_INDEX: f64 = 3.0;

const IMPORTANCE_WEIGHT: f64 = 0.4;
const MASTERY_WEIGHT: f64 = 0.3;
const DENSITY_WEIGHT: f64 = 0.2;
const LENGTH_WEIGHT: f64 = 0.1;

/// Base importance score of a course.
pub const fn importance_score(importance: Importance) -> f64 {
    match importance {
        Importance::High => 1.0,
        Importance::Medium => 0.7,
        Importance::Low => 0.4,
    }
}

/// Inputs for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMetrics {
    pub topic_id: Uuid,
    pub concept_count: u32,
    /// Difficulty on a 1-5 scale.
    pub difficulty_index: f64,
    /// Learner mastery in `0..=100`.
    pub mastery_score: i32,
}

/// Number of exam questions assigned to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicQuota {
    pub topic_id: Uuid,
    pub count: u32,
}

/// Weight of every topic, in input order.
pub fn topic_weights(importance: Importance, topics: &[TopicMetrics]) -> Vec<f64> {
    let importance = importance_score(importance);
    let max_concepts = topics
        .iter()
        .map(|t| t.concept_count)
        .max()
        .unwrap_or(0)
        .max(1);

    topics
        .iter()
        .map(|topic| {
            let mastery_factor = 1.0 - (f64::from(topic.mastery_score) / 100.0).clamp(0.0, 1.0);
            let density_factor = (topic.difficulty_index.clamp(1.0, 5.0) - 1.0) / 4.0;
            let length_factor = f64::from(topic.concept_count) / f64::from(max_concepts);

            importance * IMPORTANCE_WEIGHT
                + mastery_factor * MASTERY_WEIGHT
                + density_factor * DENSITY_WEIGHT
                + length_factor * LENGTH_WEIGHT
        })
        .collect()
}

/// Split `exam_total` questions across `topics`.
///
/// Returns one entry per topic, in input order, and the counts always sum to
/// `exam_total`. An empty topic list yields an empty allocation.
pub fn allocate_quotas(exam_total: u32, importance: Importance, topics: &[TopicMetrics]) -> Vec<TopicQuota> {
    if topics.is_empty() {
        return Vec::new();
    }

    let weights = topic_weights(importance, topics);
    let total_weight: f64 = weights.iter().sum();

    let counts = if total_weight > 0.0 && total_weight.is_finite() {
        largest_remainder(exam_total, &weights, total_weight)
    } else {
        equal_split(exam_total, topics.len())
    };

    topics
        .iter()
        .zip(counts)
        .map(|(topic, count)| TopicQuota {
            topic_id: topic.topic_id,
            count,
        })
        .collect()
}

fn equal_split(exam_total: u32, topic_count: usize) -> Vec<u32> {
    let n = u32::try_from(topic_count).unwrap_or(u32::MAX);
    let base = exam_total / n;
    let leftover = (exam_total % n) as usize;

    (0..topic_count)
        .map(|i| base + u32::from(i < leftover))
        .collect()
}

fn largest_remainder(exam_total: u32, weights: &[f64], total_weight: f64) -> Vec<u32> {
    let mut counts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());

    for (index, weight) in weights.iter().enumerate() {
        let exact = weight / total_weight * f64::from(exam_total);
        let floor = exact.floor();
        counts.push(floor as u32);
        remainders.push((index, exact - floor));
    }

    // `sort_by` is stable, so equal remainders keep input order.
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));

    let assigned: u32 = counts.iter().sum();
    let shortfall = exam_total.saturating_sub(assigned) as usize;
    for (index, _) in remainders.iter().cycle().take(shortfall) {
        counts[*index] += 1;
    }

    counts
}

/// Per-topic question generation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationQuotas {
    pub training: u32,
    pub archive: u32,
    pub mock_exam: u32,
}

/// Generation targets derived from a topic's concept count.
///
/// At least five training questions, plus 30% of that for archive refreshes
/// and 20% for mock exams, both rounded up.
pub const fn generation_quotas(concept_count: u32) -> GenerationQuotas {
    let training = if concept_count > 5 { concept_count } else { 5 };
    GenerationQuotas {
        training,
        archive: (training * 3).div_ceil(10),
        mock_exam: (training * 2).div_ceil(10),
    }
}
