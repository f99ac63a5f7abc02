// Queue - owns all KV keys for one named queue: admission, the dispatch
// loop, worker-pool sizing, jam detection, and statistics.

use crate::application::worker::Worker;
use crate::domain::{AdmitStatus, Job, JobId, QueueId, QueueKeys, QueueOptions};
use crate::error::{ConvoyError, Result};
use crate::port::{KvStore, TimeProvider};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A boxed, type-erased job handler so `StartProcessing` can accept any
/// `async fn(Job) -> Result<(), String>`-shaped closure.
type HandlerFn = Arc<
    dyn Fn(Job) -> Pin<Box<dyn Future<Output = std::result::Result<(), String>> + Send>> + Send + Sync,
>;

/// How long a single `LIST_POP_HEAD_BLOCKING` call waits before returning
/// empty-handed and letting the dispatch loop re-check the shutdown flag.
const POP_POLL_SECS: u64 = 1;

/// Owns a named queue's KV keys and background tasks. Created by
/// [`crate::application::convoy::Convoy`], never directly.
pub struct Queue {
    name: QueueId,
    keys: QueueKeys,
    kv: Arc<dyn KvStore>,
    time: Arc<dyn TimeProvider>,
    options: QueueOptions,
    log_ttl_secs: i64,
    semaphore: Arc<Semaphore>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    dispatch_handle: StdMutex<Option<JoinHandle<()>>>,
    jam_guard_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl Queue {
    pub fn new(
        name: impl Into<String>,
        kv: Arc<dyn KvStore>,
        keys_prefix: &str,
        log_ttl_secs: i64,
        options: QueueOptions,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        if options.concurrent_workers == 0 {
            return Err(ConvoyError::InvalidOption("concurrent_workers must be at least 1".to_string()));
        }

        let name = name.into();
        let keys = QueueKeys::new(keys_prefix, &name);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(options.concurrent_workers));

        Ok(Self {
            name,
            keys,
            kv,
            time,
            options,
            log_ttl_secs,
            semaphore,
            shutdown_tx,
            shutdown_rx,
            dispatch_handle: StdMutex::new(None),
            jam_guard_handle: StdMutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admit `job` into the queue. See `domain::AdmitStatus` for the
    /// returned status's meaning.
    pub async fn add_job(&self, job: &Job) -> Result<AdmitStatus> {
        let added = self.kv.set_add(&self.keys.committed, &job.id).await?;
        if added {
            self.kv.list_push_tail(&self.keys.queued, &job.id).await?;
            info!(job_id = %job.id, queue = %self.name, "job added");
            return Ok(AdmitStatus::Added);
        }

        if self.kv.zset_score(&self.keys.processing, &job.id).await?.is_some() {
            return Ok(AdmitStatus::Processing);
        }
        Ok(AdmitStatus::Committed)
    }

    /// Spawn the dispatch loop in the background; returns immediately. One
    /// dispatch task runs per `Queue` for its whole lifetime.
    pub fn start_processing<F, Fut>(&self, handler: F)
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |job| Box::pin(handler(job)));
        let kv = self.kv.clone();
        let time = self.time.clone();
        let keys = self.keys.clone();
        let name = self.name.clone();
        let semaphore = self.semaphore.clone();
        let log_ttl_secs = self.log_ttl_secs;
        let job_timeout = self.options.job_timeout;
        let mut shutdown_rx = self.shutdown_rx.clone();

        let handle = tokio::spawn(async move {
            info!(queue = %name, "dispatch loop started");
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                let popped = tokio::select! {
                    result = kv.list_pop_head_blocking(&keys.queued, POP_POLL_SECS) => result,
                    _ = shutdown_rx.changed() => {
                        drop(permit);
                        break;
                    }
                };

                let id = match popped {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        drop(permit);
                        continue;
                    }
                    Err(err) => {
                        warn!(queue = %name, error = %err, "queued pop failed");
                        drop(permit);
                        continue;
                    }
                };

                let kv = kv.clone();
                let time = time.clone();
                let keys = keys.clone();
                let handler = handler.clone();
                let job = Job::new(id);

                tokio::spawn(async move {
                    let worker = Worker::new(&keys, kv.as_ref(), time.as_ref(), log_ttl_secs);
                    let job_id = job.id.clone();
                    if let Err(err) = worker.run(&job, job_timeout, |j| handler(j)).await {
                        tracing::error!(job_id = %job_id, error = %err, "worker run failed");
                    }
                    drop(permit);
                });
            }
            info!(queue = %name, "dispatch loop stopped");
        });

        *self.dispatch_handle.lock().unwrap() = Some(handle);
    }

    /// Stop accepting new pops once the current blocking pop resolves.
    /// Jobs already dispatched continue running.
    pub fn stop_processing(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// `StopProcessing`, then block until every in-flight job task has
    /// returned its permit. Idempotent.
    pub async fn close(&self) {
        self.stop_processing();

        let handle = self.dispatch_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let _ = self.semaphore.acquire_many(self.options.concurrent_workers as u32).await;

        let jam_guard = self.jam_guard_handle.lock().unwrap().take();
        if let Some(jam_guard) = jam_guard {
            jam_guard.abort();
        }
    }

    /// Release jobs whose `processing` score is at least `threshold_secs`
    /// old, returning their ids.
    pub async fn clear_jammed_jobs(&self, threshold_secs: i64) -> Result<Vec<JobId>> {
        let cutoff = (self.time.now_secs() - threshold_secs) as f64;
        release_stale(self.kv.as_ref(), &self.keys, &self.name, cutoff).await
    }

    /// Install a recurring background scan that runs `ClearJammedJobs`
    /// every `interval` and hands the released ids to `on_scan`.
    pub fn start_jam_guard<F>(&self, interval: Duration, threshold_secs: i64, on_scan: F)
    where
        F: Fn(Vec<JobId>) + Send + Sync + 'static,
    {
        let kv = self.kv.clone();
        let time = self.time.clone();
        let keys = self.keys.clone();
        let name = self.name.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.changed() => break,
                }

                let cutoff = (time.now_secs() - threshold_secs) as f64;
                match release_stale(kv.as_ref(), &keys, &name, cutoff).await {
                    Ok(released) => on_scan(released),
                    Err(err) => warn!(queue = %name, error = %err, "jam guard scan failed"),
                }
            }
        });

        *self.jam_guard_handle.lock().unwrap() = Some(handle);
    }

    pub async fn count_queued(&self) -> Result<i64> {
        self.kv.list_len(&self.keys.queued).await
    }

    pub async fn count_committed(&self) -> Result<i64> {
        self.kv.set_card(&self.keys.committed).await
    }

    pub async fn count_processing(&self) -> Result<i64> {
        self.kv.zset_card(&self.keys.processing).await
    }

    pub async fn count_failed(&self) -> Result<i64> {
        self.kv.zset_card(&self.keys.failed).await
    }
}

async fn release_stale(kv: &dyn KvStore, keys: &QueueKeys, queue_name: &str, cutoff: f64) -> Result<Vec<JobId>> {
    let released = kv.release_stale(&keys.processing, &keys.committed, cutoff).await?;
    if !released.is_empty() {
        warn!(queue = %queue_name, count = released.len(), "released jammed jobs");
    }
    Ok(released)
}
