// Job Domain Model
//
// A job is nothing but an identity plus opaque payload metadata. Identity is
// the sole basis of deduplication (ADR: Queue admission uniqueness).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job identifier. The store treats ids as strings regardless of what the
/// caller constructed them from.
pub type JobId = String;

/// A unit of work submitted to a queue.
///
/// Equality is string equality over `id` only; the payload never
/// participates in deduplication or comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub payload: Option<Value>,
}

impl Job {
    /// Create a job with no payload.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: None,
        }
    }

    /// Create a job carrying opaque JSON payload metadata.
    pub fn with_payload(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload: Some(payload),
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_id_only() {
        let a = Job::with_payload("1", serde_json::json!({"x": 1}));
        let b = Job::with_payload("1", serde_json::json!({"x": 2}));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        assert_ne!(Job::new("1"), Job::new("2"));
    }

    #[test]
    fn new_has_no_payload() {
        let job = Job::new("abc");
        assert!(job.payload.is_none());
    }
}
