//! Adaptive response-time ceiling.
//!
//! A correct answer only counts as a full success when it arrives within the
//! time budget of its question. The budget grows with the amount of text the
//! learner has to read, the number of concepts in the topic, and the bloom level.

use crate::types::BloomLevel;

/// Reading speed in characters per minute.
pub const READING_SPEED_CHARS_PER_MIN: f64 = 780.0;

/// Fixed thinking time per question in seconds, before concepts are added.
pub const BASE_COMPLEXITY_SECONDS: f64 = 15.0;

/// Extra thinking time per concept in seconds.
pub const SECONDS_PER_CONCEPT: f64 = 2.0;

/// Slack added on top of every budget unless the caller overrides it.
pub const DEFAULT_BUFFER_SECONDS: f64 = 10.0;

/// Concept count assumed when a topic has no concept map.
pub const DEFAULT_CONCEPT_COUNT: u32 = 5;

/// Fast/slow threshold used when question or topic metadata is missing.
pub const FALLBACK_FAST_THRESHOLD_MS: u64 = 30_000;

/// Multiplier applied to the complexity time for each bloom level.
pub const fn difficulty_multiplier(level: BloomLevel) -> f64 {
    match level {
        BloomLevel::Knowledge => 1.0,
        BloomLevel::Application => 1.2,
        BloomLevel::Analysis => 1.5,
    }
}

/// Compute the expected-response-time ceiling in milliseconds.
///
/// # Arguments
///
/// * `char_count` - Length of the topic text the question is drawn from
/// * `concept_count` - Number of concepts in the topic
/// * `bloom_level` - Cognitive level of the question
/// * `buffer_seconds` - Slack added to the budget, usually [`DEFAULT_BUFFER_SECONDS`]
///
/// # Algorithm
///
/// ```text
/// reading    = char_count / 780 * 60
/// complexity = (15 + concept_count * 2) * multiplier(bloom_level)
/// t_max_ms   = round((reading + complexity + buffer) * 1000)
/// ```
pub fn time_budget_ms(
    char_count: usize,
    concept_count: u32,
    bloom_level: BloomLevel,
    buffer_seconds: f64,
) -> u64 {
    let reading_seconds = char_count as f64 / READING_SPEED_CHARS_PER_MIN * 60.0;
    let complexity_seconds = (BASE_COMPLEXITY_SECONDS
        + f64::from(concept_count) * SECONDS_PER_CONCEPT)
        * difficulty_multiplier(bloom_level);
    let total_seconds = reading_seconds + complexity_seconds + buffer_seconds.max(0.0);

    (total_seconds * 1000.0).round() as u64
}

/// Whether an answer arrived within its time budget.
pub const fn is_fast(actual_time_ms: u64, t_max_ms: u64) -> bool {
    actual_time_ms <= t_max_ms
}

/// Classify a response as fast, falling back to a flat threshold when the
/// question or topic metadata needed for a budget is unknown.
///
/// `budget_inputs` is `(char_count, concept_count, bloom_level)`; a missing
/// concept count falls back to [`DEFAULT_CONCEPT_COUNT`].
pub fn classify_response_time(
    time_spent_ms: u64,
    budget_inputs: Option<(usize, Option<u32>, BloomLevel)>,
) -> bool {
    match budget_inputs {
        Some((char_count, concept_count, bloom_level)) => {
            let concepts = concept_count.unwrap_or(DEFAULT_CONCEPT_COUNT);
            let t_max = time_budget_ms(char_count, concepts, bloom_level, DEFAULT_BUFFER_SECONDS);
            is_fast(time_spent_ms, t_max)
        }
        None => time_spent_ms < FALLBACK_FAST_THRESHOLD_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_budget_known_values() {
        // No text, no concepts: 15s complexity + 10s buffer
        assert_eq!(time_budget_ms(0, 0, BloomLevel::Knowledge, 10.0), 25_000);

        // 780 chars is exactly one minute of reading
        assert_eq!(time_budget_ms(780, 0, BloomLevel::Knowledge, 10.0), 85_000);

        // (15 + 5 * 2) * 1.5 = 37.5s complexity
        assert_eq!(time_budget_ms(0, 5, BloomLevel::Analysis, 0.0), 37_500);

        // (15 + 3 * 2) * 1.2 = 25.2s complexity
        assert_eq!(time_budget_ms(0, 3, BloomLevel::Application, 10.0), 35_200);
    }

    #[test]
    fn test_time_budget_grows_with_concepts() {
        for level in [
            BloomLevel::Knowledge,
            BloomLevel::Application,
            BloomLevel::Analysis,
        ] {
            let mut previous = time_budget_ms(1200, 0, level, DEFAULT_BUFFER_SECONDS);
            for concepts in 1..30 {
                let current = time_budget_ms(1200, concepts, level, DEFAULT_BUFFER_SECONDS);
                assert!(current > previous, "{level} at {concepts} concepts");
                previous = current;
            }
        }
    }

    #[test]
    fn test_time_budget_grows_with_bloom_level() {
        for concepts in [0, 1, 5, 12] {
            let knowledge = time_budget_ms(500, concepts, BloomLevel::Knowledge, 10.0);
            let application = time_budget_ms(500, concepts, BloomLevel::Application, 10.0);
            let analysis = time_budget_ms(500, concepts, BloomLevel::Analysis, 10.0);
            assert!(knowledge < application);
            assert!(application < analysis);
        }
    }

    #[test]
    fn test_is_fast_boundary_is_inclusive() {
        assert!(is_fast(25_000, 25_000));
        assert!(!is_fast(25_001, 25_000));
    }

    #[test]
    fn test_classify_without_metadata_uses_flat_threshold() {
        assert!(classify_response_time(29_999, None));
        assert!(!classify_response_time(30_000, None));
    }

    #[test]
    fn test_classify_defaults_concept_count() {
        // 5 default concepts: (15 + 10) * 1.0 + 10 = 35s
        assert!(classify_response_time(35_000, Some((0, None, BloomLevel::Knowledge))));
        assert!(!classify_response_time(35_001, Some((0, None, BloomLevel::Knowledge))));
    }
}
