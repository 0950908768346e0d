//! Score deltas, blended topic mastery and the bloom/time weighted score.

use serde::{Deserialize, Serialize};

use crate::types::{BloomLevel, ResponseType};

pub const POINTS_CORRECT: i32 = 10;
pub const PENALTY_INCORRECT_FIRST: i32 = 5;
pub const PENALTY_BLANK_FIRST: i32 = 2;
pub const PENALTY_REPEATED: i32 = 10;

/// Upper bound of every mastery value.
pub const MAX_SCORE: i32 = 100;

/// Points of blended mastery contributed by full topic coverage.
pub const COVERAGE_POINTS: f64 = 60.0;

/// Share of blended mastery contributed by the running score.
pub const SCORE_WEIGHT: f64 = 0.4;

/// Coverage ratio at which a topic counts as freshly reviewed.
pub const REFRESH_COVERAGE_RATIO: f64 = 0.8;

/// Mastery below which a topic is considered weak.
pub const MASTERY_THRESHOLD: i32 = 80;

/// Raw delta and the clamped score it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub delta: i32,
    pub new_score: i32,
}

/// Raw score delta for a response.
///
/// A repeated non-correct answer costs a flat [`PENALTY_REPEATED`], whether it
/// was wrong or blank.
pub const fn score_delta(response: ResponseType, is_repeated: bool) -> i32 {
    match (response, is_repeated) {
        (ResponseType::Correct, _) => POINTS_CORRECT,
        (ResponseType::Incorrect | ResponseType::Blank, true) => -PENALTY_REPEATED,
        (ResponseType::Incorrect, false) => -PENALTY_INCORRECT_FIRST,
        (ResponseType::Blank, false) => -PENALTY_BLANK_FIRST,
    }
}

/// Apply a response to a score, clamping the result to `0..=100`.
pub fn score_change(response: ResponseType, current_score: i32, is_repeated: bool) -> ScoreChange {
    let delta = score_delta(response, is_repeated);
    ScoreChange {
        delta,
        new_score: current_score.saturating_add(delta).clamp(0, MAX_SCORE),
    }
}

/// Topic mastery after blending coverage with the running score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteryBlend {
    pub mastery: i32,
    pub coverage_ratio: f64,
    pub is_topic_refreshed: bool,
}

/// Share of a topic's questions the learner has solved at least once.
///
/// Zero when the topic has no questions.
pub fn coverage_ratio(unique_solved: u32, total_questions: u32) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    (f64::from(unique_solved) / f64::from(total_questions)).min(1.0)
}

/// Blend topic coverage (60 points) with the running score (40%).
pub fn blended_mastery(unique_solved: u32, total_questions: u32, new_score: i32) -> MasteryBlend {
    let ratio = coverage_ratio(unique_solved, total_questions);
    let score = f64::from(new_score.clamp(0, MAX_SCORE));
    let mastery = ratio.mul_add(COVERAGE_POINTS, score * SCORE_WEIGHT).round() as i32;

    MasteryBlend {
        mastery: mastery.clamp(0, MAX_SCORE),
        coverage_ratio: ratio,
        is_topic_refreshed: total_questions > 0 && ratio >= REFRESH_COVERAGE_RATIO,
    }
}

/// Bloom coefficient of the advanced score.
pub const fn bloom_coefficient(level: BloomLevel) -> f64 {
    match level {
        BloomLevel::Knowledge => 1.0,
        BloomLevel::Application => 1.3,
        BloomLevel::Analysis => 1.6,
    }
}

/// Target answer time in milliseconds for the advanced score.
pub const fn target_time_ms(level: BloomLevel) -> u64 {
    match level {
        BloomLevel::Knowledge => 20_000,
        BloomLevel::Application => 35_000,
        BloomLevel::Analysis => 50_000,
    }
}

/// Components of the bloom/time weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvancedScore {
    pub base_delta: i32,
    pub final_score: f64,
    pub bloom_coefficient: f64,
    pub time_ratio: f64,
}

/// Weight a base delta by bloom level and answer speed.
///
/// `final = delta * bloom_coefficient * clamp(target / max(actual, 1000), 0.5, 2.0)`,
/// rounded to two decimals. The practice service returns it next to the
/// submission result; it does not feed blended mastery or the shelf.
pub fn advanced_score(base_delta: i32, bloom_level: BloomLevel, time_spent_ms: u64) -> AdvancedScore {
    let coefficient = bloom_coefficient(bloom_level);
    let actual = time_spent_ms.max(1000) as f64;
    let time_ratio = (target_time_ms(bloom_level) as f64 / actual).clamp(0.5, 2.0);
    let raw = f64::from(base_delta) * coefficient * time_ratio;

    AdvancedScore {
        base_delta,
        final_score: round2(raw),
        bloom_coefficient: coefficient,
        time_ratio: round2(time_ratio),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
