// RedisKvStore - convoy_core::port::KvStore over a real Redis connection.

use crate::connection::RedisConnections;
use crate::scripts;
use async_trait::async_trait;
use convoy_core::error::{ConvoyError, Result};
use convoy_core::port::KvStore;
use redis::AsyncCommands;

pub struct RedisKvStore {
    conn: RedisConnections,
}

impl RedisKvStore {
    pub fn new(conn: RedisConnections) -> Self {
        Self { conn }
    }
}

fn map_err(err: redis::RedisError) -> ConvoyError {
    ConvoyError::Kv(err.to_string())
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn.manager.clone();
        let added: i64 = conn.sadd(key, member).await.map_err(map_err)?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: () = conn.srem(key, member).await.map_err(map_err)?;
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn.manager.clone();
        conn.sismember(key, member).await.map_err(map_err)
    }

    async fn set_card(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.manager.clone();
        conn.scard(key).await.map_err(map_err)
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: () = conn.rpush(key, value).await.map_err(map_err)?;
        Ok(())
    }

    async fn list_pop_head_blocking(&self, key: &str, timeout_secs: u64) -> Result<Option<String>> {
        let mut conn = self.conn.blocking.lock().await;
        let result: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(timeout_secs)
            .query_async(&mut *conn)
            .await
            .map_err(map_err)?;
        Ok(result.map(|(_key, value)| value))
    }

    async fn list_len(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.manager.clone();
        conn.llen(key).await.map_err(map_err)
    }

    async fn zset_upsert(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: () = conn.zadd(key, member, score).await.map_err(map_err)?;
        Ok(())
    }

    async fn zset_score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let mut conn = self.conn.manager.clone();
        conn.zscore(key, member).await.map_err(map_err)
    }

    async fn zset_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: () = conn.zrem(key, member).await.map_err(map_err)?;
        Ok(())
    }

    async fn zset_card(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.manager.clone();
        conn.zcard(key).await.map_err(map_err)
    }

    async fn zset_range_by_score(&self, key: &str, min: f64, max: f64) -> Result<Vec<String>> {
        let mut conn = self.conn.manager.clone();
        conn.zrangebyscore(key, min, max).await.map_err(map_err)
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: () = conn.expire(key, seconds).await.map_err(map_err)?;
        Ok(())
    }

    async fn complete(&self, committed_key: &str, processing_key: &str, id: &str) -> Result<()> {
        let mut conn = self.conn.manager.clone();
        let _: i64 = scripts::complete_script()
            .key(committed_key)
            .key(processing_key)
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
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
        let mut conn = self.conn.manager.clone();
        let _: i64 = scripts::fail_script()
            .key(committed_key)
            .key(processing_key)
            .key(failed_key)
            .key(error_log_key)
            .arg(id)
            .arg(score)
            .arg(message)
            .arg(log_ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn release_stale(&self, processing_key: &str, committed_key: &str, cutoff: f64) -> Result<Vec<String>> {
        let mut conn = self.conn.manager.clone();
        scripts::release_stale_script()
            .key(processing_key)
            .key(committed_key)
            .arg(cutoff)
            .invoke_async(&mut conn)
            .await
            .map_err(map_err)
    }
}
