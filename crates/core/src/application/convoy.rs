// Convoy - factory producing queues that share a KV client.

use crate::application::queue::Queue;
use crate::domain::{Job, QueueOptions};
use crate::error::Result;
use crate::port::{KvStore, SystemTimeProvider, TimeProvider};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed async factory producing a fresh `KvStore` client, fallible since
/// connecting to a real backend can fail. Held by `Convoy` rather than as
/// process-wide mutable state, so tests can substitute an in-memory adapter
/// and deployments can substitute connection settings.
type KvFactory = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Arc<dyn KvStore>>> + Send>> + Send + Sync>;

/// Produces `Queue`s that share a process's KV client factory and key
/// prefix. The factory is invoked once per queue; the resulting client is
/// owned by that queue from then on.
pub struct Convoy {
    keys_prefix: String,
    log_ttl_secs: i64,
    kv_factory: KvFactory,
    time: Arc<dyn TimeProvider>,
}

impl Convoy {
    pub fn new<F, Fut>(keys_prefix: impl Into<String>, log_ttl_secs: i64, kv_factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn KvStore>>> + Send + 'static,
    {
        Self {
            keys_prefix: keys_prefix.into(),
            log_ttl_secs,
            kv_factory: Arc::new(move || Box::pin(kv_factory())),
            time: Arc::new(SystemTimeProvider),
        }
    }

    /// Override the time provider (used by tests needing a deterministic
    /// clock; production callers never need this).
    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    /// Create a queue named `name`, calling the KV factory once to obtain
    /// its client.
    pub async fn create_queue(&self, name: impl Into<String>, options: QueueOptions) -> Result<Queue> {
        let kv = (self.kv_factory)().await?;
        Queue::new(name, kv, &self.keys_prefix, self.log_ttl_secs, options, self.time.clone())
    }

    /// Construct a job with no payload. A thin convenience so callers don't
    /// need to import `domain::Job` directly just to build one.
    pub fn job(&self, id: impl Into<String>) -> Job {
        Job::new(id)
    }
}
