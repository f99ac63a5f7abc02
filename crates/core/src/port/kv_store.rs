// KV Adapter Port
//
// The primitives the queue state machine needs from a shared KV store,
// plus the handful of multi-key operations that must apply as a unit. The
// core never talks to Redis directly; it only ever sees this trait.

use crate::error::Result;
use async_trait::async_trait;

/// Shared KV store abstraction. Implementations must make every individual
/// method atomic; `complete`, `fail`, and `release_stale` must additionally
/// be atomic across the multiple keys they touch.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Add `member` to the set at `key`. Returns `true` iff the member was
    /// not already present (i.e. the set actually changed).
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;
    async fn set_card(&self, key: &str) -> Result<i64>;

    async fn list_push_tail(&self, key: &str, value: &str) -> Result<()>;
    /// Block up to `timeout_secs` waiting for an element at the head of the
    /// list; returns `None` on timeout rather than erroring.
    async fn list_pop_head_blocking(&self, key: &str, timeout_secs: u64) -> Result<Option<String>>;
    async fn list_len(&self, key: &str) -> Result<i64>;

    async fn zset_upsert(&self, key: &str, member: &str, score: f64) -> Result<()>;
    async fn zset_score(&self, key: &str, member: &str) -> Result<Option<f64>>;
    async fn zset_remove(&self, key: &str, member: &str) -> Result<()>;
    async fn zset_card(&self, key: &str) -> Result<i64>;
    async fn zset_range_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>>;

    async fn expire(&self, key: &str, seconds: i64) -> Result<()>;

    /// Atomically remove `id` from `committed_key` and `processing_key`
    /// (the successful-completion transition).
    async fn complete(&self, committed_key: &str, processing_key: &str, id: &str) -> Result<()>;

    /// Atomically remove `id` from `committed_key`/`processing_key`, upsert
    /// it into `failed_key` with `score`, push `message` onto
    /// `error_log_key`, and set that key's TTL to `log_ttl_secs`.
    #[allow(clippy::too_many_arguments)]
    async fn fail(
        &self,
        committed_key: &str,
        processing_key: &str,
        failed_key: &str,
        error_log_key: &str,
        id: &str,
        score: f64,
        message: &str,
        log_ttl_secs: i64,
    ) -> Result<()>;

    /// Atomically scan `processing_key` for members scored `<= cutoff`,
    /// remove each from both `processing_key` and `committed_key`, and
    /// return the released ids.
    async fn release_stale(
        &self,
        processing_key: &str,
        committed_key: &str,
        cutoff: f64,
    ) -> Result<Vec<String>>;
}

/// In-memory `KvStore` used by every test in the workspace. Public (not
/// `cfg(test)`) so the integration-test crate and the Redis adapter's own
/// tests can depend on it without linking a real KV backend.
pub mod mocks {
    use super::*;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct State {
        sets: HashMap<String, HashSet<String>>,
        lists: HashMap<String, VecDeque<String>>,
        zsets: HashMap<String, HashMap<String, f64>>,
        ttls: HashMap<String, i64>,
    }

    /// A single-process, in-memory stand-in for a Redis-backed `KvStore`.
    ///
    /// Blocking pop is implemented by short polling rather than a wakeup
    /// channel; this is a test double, not a performance-sensitive path.
    pub struct InMemoryKvStore {
        state: Mutex<State>,
    }

    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    impl InMemoryKvStore {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State::default()),
            }
        }

        /// Test-only introspection: the TTL (in seconds) last recorded for
        /// `key` via `expire` or `fail`. Not part of the `KvStore` trait
        /// because production code never needs to read a TTL back.
        pub async fn ttl_of(&self, key: &str) -> Option<i64> {
            self.state.lock().await.ttls.get(key).copied()
        }
    }

    impl Default for InMemoryKvStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl KvStore for InMemoryKvStore {
        async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
            let mut state = self.state.lock().await;
            Ok(state.sets.entry(key.to_string()).or_default().insert(member.to_string()))
        }

        async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
            let mut state = self.state.lock().await;
            if let Some(set) = state.sets.get_mut(key) {
                set.remove(member);
            }
            Ok(())
        }

        async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
            let state = self.state.lock().await;
            Ok(state.sets.get(key).map(|s| s.contains(member)).unwrap_or(false))
        }

        async fn set_card(&self, key: &str) -> Result<i64> {
            let state = self.state.lock().await;
            Ok(state.sets.get(key).map(|s| s.len() as i64).unwrap_or(0))
        }

        async fn list_push_tail(&self, key: &str, value: &str) -> Result<()> {
            let mut state = self.state.lock().await;
            state.lists.entry(key.to_string()).or_default().push_back(value.to_string());
            Ok(())
        }

        async fn list_pop_head_blocking(&self, key: &str, timeout_secs: u64) -> Result<Option<String>> {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs.max(1));
            loop {
                {
                    let mut state = self.state.lock().await;
                    if let Some(list) = state.lists.get_mut(key) {
                        if let Some(v) = list.pop_front() {
                            return Ok(Some(v));
                        }
                    }
                }
                if tokio::time::Instant::now() >= deadline {
                    return Ok(None);
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        async fn list_len(&self, key: &str) -> Result<i64> {
            let state = self.state.lock().await;
            Ok(state.lists.get(key).map(|l| l.len() as i64).unwrap_or(0))
        }

        async fn zset_upsert(&self, key: &str, member: &str, score: f64) -> Result<()> {
            let mut state = self.state.lock().await;
            state.zsets.entry(key.to_string()).or_default().insert(member.to_string(), score);
            Ok(())
        }

        async fn zset_score(&self, key: &str, member: &str) -> Result<Option<f64>> {
            let state = self.state.lock().await;
            Ok(state.zsets.get(key).and_then(|z| z.get(member).copied()))
        }

        async fn zset_remove(&self, key: &str, member: &str) -> Result<()> {
            let mut state = self.state.lock().await;
            if let Some(z) = state.zsets.get_mut(key) {
                z.remove(member);
            }
            Ok(())
        }

        async fn zset_card(&self, key: &str) -> Result<i64> {
            let state = self.state.lock().await;
            Ok(state.zsets.get(key).map(|z| z.len() as i64).unwrap_or(0))
        }

        async fn zset_range_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
            let state = self.state.lock().await;
            Ok(state
                .zsets
                .get(key)
                .map(|z| {
                    z.iter()
                        .filter(|(_, &score)| score >= min && score <= max)
                        .map(|(member, _)| member.clone())
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn expire(&self, key: &str, seconds: i64) -> Result<()> {
            let mut state = self.state.lock().await;
            state.ttls.insert(key.to_string(), seconds);
            Ok(())
        }

        async fn complete(&self, committed_key: &str, processing_key: &str, id: &str) -> Result<()> {
            let mut state = self.state.lock().await;
            if let Some(set) = state.sets.get_mut(committed_key) {
                set.remove(id);
            }
            if let Some(z) = state.zsets.get_mut(processing_key) {
                z.remove(id);
            }
            Ok(())
        }

        async fn fail(
            &self,
            committed_key: &str,
            processing_key: &str,
            failed_key: &str,
            error_log_key: &str,
            id: &str,
            score: f64,
            message: &str,
            log_ttl_secs: i64,
        ) -> Result<()> {
            let mut state = self.state.lock().await;
            if let Some(set) = state.sets.get_mut(committed_key) {
                set.remove(id);
            }
            if let Some(z) = state.zsets.get_mut(processing_key) {
                z.remove(id);
            }
            state
                .zsets
                .entry(failed_key.to_string())
                .or_default()
                .insert(id.to_string(), score);
            state
                .lists
                .entry(error_log_key.to_string())
                .or_default()
                .push_front(message.to_string());
            state.ttls.insert(error_log_key.to_string(), log_ttl_secs);
            Ok(())
        }

        async fn release_stale(
            &self,
            processing_key: &str,
            committed_key: &str,
            cutoff: f64,
        ) -> Result<Vec<String>> {
            let mut state = self.state.lock().await;
            let released: Vec<String> = state
                .zsets
                .get(processing_key)
                .map(|z| z.iter().filter(|(_, &s)| s <= cutoff).map(|(k, _)| k.clone()).collect())
                .unwrap_or_default();

            if let Some(z) = state.zsets.get_mut(processing_key) {
                for id in &released {
                    z.remove(id);
                }
            }
            if let Some(set) = state.sets.get_mut(committed_key) {
                for id in &released {
                    set.remove(id);
                }
            }
            Ok(released)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn set_add_reports_whether_it_mutated() {
            let kv = InMemoryKvStore::new();
            assert!(kv.set_add("committed", "1").await.unwrap());
            assert!(!kv.set_add("committed", "1").await.unwrap());
            assert_eq!(kv.set_card("committed").await.unwrap(), 1);
        }

        #[tokio::test]
        async fn blocking_pop_returns_none_on_timeout() {
            let kv = InMemoryKvStore::new();
            let popped = kv.list_pop_head_blocking("queued", 1).await.unwrap();
            assert!(popped.is_none());
        }

        #[tokio::test]
        async fn blocking_pop_sees_a_concurrent_push() {
            let kv = std::sync::Arc::new(InMemoryKvStore::new());
            let kv2 = kv.clone();
            let popper = tokio::spawn(async move { kv2.list_pop_head_blocking("queued", 5).await.unwrap() });

            tokio::time::sleep(Duration::from_millis(30)).await;
            kv.list_push_tail("queued", "job-1").await.unwrap();

            let popped = popper.await.unwrap();
            assert_eq!(popped, Some("job-1".to_string()));
        }

        #[tokio::test]
        async fn release_stale_removes_from_both_keys() {
            let kv = InMemoryKvStore::new();
            kv.set_add("committed", "98").await.unwrap();
            kv.zset_upsert("processing", "98", 100.0).await.unwrap();

            let released = kv.release_stale("processing", "committed", 100.0).await.unwrap();
            assert_eq!(released, vec!["98".to_string()]);
            assert!(!kv.set_contains("committed", "98").await.unwrap());
            assert_eq!(kv.zset_score("processing", "98").await.unwrap(), None);
        }

        #[tokio::test]
        async fn fail_records_score_message_and_ttl() {
            let kv = InMemoryKvStore::new();
            kv.set_add("committed", "1").await.unwrap();
            kv.zset_upsert("processing", "1", 50.0).await.unwrap();

            kv.fail("committed", "processing", "failed", "errorLog.0", "1", 51.0, "boom", 86400)
                .await
                .unwrap();

            assert!(!kv.set_contains("committed", "1").await.unwrap());
            assert_eq!(kv.zset_score("processing", "1").await.unwrap(), None);
            assert_eq!(kv.zset_card("failed").await.unwrap(), 1);
            assert_eq!(kv.list_len("errorLog.0").await.unwrap(), 1);
            assert_eq!(kv.ttl_of("errorLog.0").await, Some(86400));
        }
    }
}
