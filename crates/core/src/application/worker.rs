// Worker - owns a single job's processing -> completed|failed transition.

use crate::domain::{Job, QueueKeys};
use crate::error::Result;
use crate::port::{KvStore, TimeProvider};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Terminal outcome of running a job to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
}

/// Runs one `(Queue, Job)` pair's lifecycle: marks the job processing,
/// invokes the caller's handler (racing an optional timeout), and records
/// whichever terminal transition wins.
///
/// Borrows the queue's keys and KV client for the duration of a single
/// `run` call rather than holding a backreference to the owning `Queue`.
pub struct Worker<'a> {
    keys: &'a QueueKeys,
    kv: &'a dyn KvStore,
    time: &'a dyn TimeProvider,
    log_ttl_secs: i64,
}

impl<'a> Worker<'a> {
    pub fn new(keys: &'a QueueKeys, kv: &'a dyn KvStore, time: &'a dyn TimeProvider, log_ttl_secs: i64) -> Self {
        Self {
            keys,
            kv,
            time,
            log_ttl_secs,
        }
    }

    /// Marks `job` processing, runs `handler` (timing it out after
    /// `job_timeout` if set), and performs the resulting atomic transition.
    pub async fn run<F, Fut>(&self, job: &Job, job_timeout: Option<Duration>, handler: F) -> Result<JobOutcome>
    where
        F: FnOnce(Job) -> Fut,
        Fut: Future<Output = std::result::Result<(), String>>,
    {
        let started_at = self.time.now_secs();
        self.kv.zset_upsert(&self.keys.processing, &job.id, started_at as f64).await?;
        info!(job_id = %job.id, "job marked processing");

        let handler_fut = handler(job.clone());

        let outcome = match job_timeout {
            Some(timeout) => {
                tokio::select! {
                    result = handler_fut => result,
                    _ = tokio::time::sleep(timeout) => Err("timeout".to_string()),
                }
            }
            None => handler_fut.await,
        };

        match outcome {
            Ok(()) => {
                self.kv.complete(&self.keys.committed, &self.keys.processing, &job.id).await?;
                info!(job_id = %job.id, "job completed");
                Ok(JobOutcome::Completed)
            }
            Err(message) => {
                let failed_at = self.time.now_secs();
                let day_start = failed_at - failed_at.rem_euclid(86_400);
                let error_log_key = self.keys.error_log(day_start);
                self.kv
                    .fail(
                        &self.keys.committed,
                        &self.keys.processing,
                        &self.keys.failed,
                        &error_log_key,
                        &job.id,
                        failed_at as f64,
                        &message,
                        self.log_ttl_secs,
                    )
                    .await?;
                warn!(job_id = %job.id, error = %message, "job failed");
                Ok(JobOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueKeys;
    use crate::port::kv_store::mocks::InMemoryKvStore;

    struct FixedTime(i64);
    impl TimeProvider for FixedTime {
        fn now_secs(&self) -> i64 {
            self.0
        }
    }

    #[tokio::test]
    async fn successful_handler_completes_the_job() {
        let kv = InMemoryKvStore::new();
        let keys = QueueKeys::new("convoy", "ingest");
        let time = FixedTime(1_000);
        kv.set_add(&keys.committed, "1").await.unwrap();

        let worker = Worker::new(&keys, &kv, &time, 86_400);
        let outcome = worker.run(&Job::new("1"), None, |_| async { Ok(()) }).await.unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        assert!(!kv.set_contains(&keys.committed, "1").await.unwrap());
        assert_eq!(kv.zset_score(&keys.processing, "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failing_handler_records_failure_and_error_log() {
        let kv = InMemoryKvStore::new();
        let keys = QueueKeys::new("convoy", "ingest");
        let time = FixedTime(1_000);
        kv.set_add(&keys.committed, "1").await.unwrap();

        let worker = Worker::new(&keys, &kv, &time, 86_400);
        let outcome = worker
            .run(&Job::new("1"), None, |_| async { Err("boom".to_string()) })
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Failed);
        assert!(!kv.set_contains(&keys.committed, "1").await.unwrap());
        assert_eq!(kv.zset_card(&keys.failed).await.unwrap(), 1);
        assert_eq!(kv.list_len(&keys.error_log(0)).await.unwrap(), 1);
        assert_eq!(kv.ttl_of(&keys.error_log(0)).await, Some(86_400));
    }

    #[tokio::test]
    async fn handler_that_never_resolves_times_out() {
        let kv = InMemoryKvStore::new();
        let keys = QueueKeys::new("convoy", "ingest");
        let time = FixedTime(1_000);
        kv.set_add(&keys.committed, "1").await.unwrap();

        let worker = Worker::new(&keys, &kv, &time, 86_400);
        let outcome = worker
            .run(&Job::new("1"), Some(Duration::from_millis(20)), |_| async {
                tokio::time::sleep(Duration::from_secs(6)).await;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Failed);
        assert_eq!(kv.zset_card(&keys.failed).await.unwrap(), 1);
    }
}
