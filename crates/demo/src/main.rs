// Convoy Demo - composition root exercising the job queue end to end.
// Not a general-purpose CLI: loads configuration, builds a Convoy, runs
// one queue with a sample handler, and shuts down cleanly on SIGINT/SIGTERM.

mod config;

use anyhow::{Context, Result};
use convoy_core::application::Convoy;
use convoy_core::domain::{Job, QueueOptions};
use convoy_core::error::ConvoyError;
use convoy_core::port::KvStore;
use convoy_redis::RedisKvStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const QUEUE_NAME: &str = "demo";
const JAM_GUARD_THRESHOLD_SECS: i64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cfg = config::DemoConfig::load().context("loading configuration")?;
    info!(prefix = %cfg.keys.prefix, redis_url = %cfg.redis.url, "convoy demo starting");

    let log_ttl_secs = cfg.keys.log_ttl_secs;
    let redis_url = cfg.redis.url.clone();
    let redis_database = cfg.redis.database;

    let convoy = Convoy::new(cfg.keys.prefix.clone(), log_ttl_secs, move || {
        let redis_url = redis_url.clone();
        async move {
            let conn = convoy_redis::connect(&redis_url, redis_database)
                .await
                .map_err(|e| ConvoyError::Kv(e.to_string()))?;
            Ok(Arc::new(RedisKvStore::new(conn)) as Arc<dyn KvStore>)
        }
    });

    let queue = Arc::new(
        convoy
            .create_queue(QUEUE_NAME, QueueOptions::new(4).with_job_timeout(Duration::from_secs(30)))
            .await
            .context("creating demo queue")?,
    );

    queue.start_jam_guard(Duration::from_secs(60), JAM_GUARD_THRESHOLD_SECS, |released| {
        if !released.is_empty() {
            warn!(count = released.len(), "jam guard released stale jobs");
        }
    });

    queue.start_processing(|job| async move {
        info!(job_id = %job.id, "processing job");
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(())
    });

    for i in 0..5 {
        let job = Job::with_payload(format!("job-{i}"), serde_json::json!({ "n": i }));
        let status = queue.add_job(&job).await.context("adding sample job")?;
        info!(job_id = %job.id, ?status, "sample job submitted");
    }

    info!("convoy demo ready, press ctrl+c to shut down");
    wait_for_shutdown_signal().await.context("waiting for shutdown signal")?;

    info!("shutdown signal received, closing queue");
    queue.close().await;
    info!("shutdown complete");

    Ok(())
}

/// Waits for either `SIGINT` (ctrl-c) or, on Unix, `SIGTERM`.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("waiting for SIGINT"),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.context("waiting for SIGINT")
}

fn init_logging() {
    let log_format = std::env::var("CONVOY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("convoy=info"));

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}
