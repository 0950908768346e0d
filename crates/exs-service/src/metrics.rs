//! Counters and histograms for the study pipeline.
//!
//! Only the `metrics` facade is used here; installing an exporter is up to
//! the embedding process.

use exs_srs::ResponseType;
use metrics::{counter, histogram};

/// Count one evaluated answer.
pub fn record_response(response: ResponseType, is_topic_refreshed: bool) {
    counter!("exs_responses_total", "outcome" => response.as_str()).increment(1);

    if is_topic_refreshed {
        counter!("exs_topic_refreshes_total").increment(1);
    }
}

/// Record the length of a built review queue.
pub fn record_queue_size(len: usize, targeted: bool) {
    histogram!(
        "exs_review_queue_size",
        "targeted" => if targeted { "true" } else { "false" }
    )
    .record(len as f64);
}

/// Count questions accepted from the content source.
pub fn record_generated_questions(count: usize) {
    counter!("exs_exam_questions_generated_total").increment(count as u64);
}

/// Count a retried content-source call.
pub fn record_content_retry(reason: &'static str) {
    counter!("exs_content_retries_total", "reason" => reason).increment(1);
}
