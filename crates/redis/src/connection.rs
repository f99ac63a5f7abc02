// Redis connection setup.
//
// Two connections are kept: a multiplexed, auto-reconnecting
// `ConnectionManager` for every ordinary command, and one dedicated
// connection behind an async mutex reserved for `BLPOP`. Sharing the
// blocking call with the multiplexed connection would stall every other
// in-flight command behind it in Redis's response queue.

use redis::aio::{Connection, ConnectionManager};
use redis::{Client, RedisError};
use tokio::sync::Mutex;
use tracing::info;

pub struct RedisConnections {
    pub(crate) manager: ConnectionManager,
    pub(crate) blocking: Mutex<Connection>,
}

/// Connect to `url`, optionally selecting logical database `database`.
///
/// `SELECT` is a connection-level command, not exposed via `AsyncCommands`,
/// so it's issued directly on each connection rather than through the
/// client's command helpers.
pub async fn connect(url: &str, database: Option<i64>) -> Result<RedisConnections, RedisError> {
    let client = Client::open(url)?;

    let mut manager = ConnectionManager::new(client.clone()).await?;
    let mut blocking = client.get_async_connection().await?;

    if let Some(db) = database {
        let _: () = redis::cmd("SELECT").arg(db).query_async(&mut manager).await?;
        let _: () = redis::cmd("SELECT").arg(db).query_async(&mut blocking).await?;
    }

    info!(url = %url, database = ?database, "connected to redis");
    Ok(RedisConnections {
        manager,
        blocking: Mutex::new(blocking),
    })
}
