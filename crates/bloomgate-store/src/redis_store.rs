use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use bloomgate_core::{BackingStore, GateError, GateResult};

/// Redis-backed store over a multiplexed, auto-reconnecting connection.
///
/// Cloning the connection manager is cheap and every clone shares the same
/// socket, so one `RedisStore` serves all loader tasks.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    url: String,
}

impl RedisStore {
    /// Connect to `endpoint`, either `host:port` or a full `redis://` URL.
    pub async fn connect(endpoint: &str) -> GateResult<Self> {
        let url = redis_url(endpoint);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| GateError::Store(format!("invalid redis endpoint {url}: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| GateError::Store(format!("cannot connect to {url}: {e}")))?;
        debug!(%url, "connected to redis");
        Ok(Self { conn, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Round-trip a `PING`.
    pub async fn ping(&self) -> GateResult<Duration> {
        let mut conn = self.conn.clone();
        let started = Instant::now();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(started.elapsed())
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(value)
    }
}

fn store_err(e: redis::RedisError) -> GateError {
    GateError::Store(e.to_string())
}

fn redis_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("redis://{endpoint}")
    }
}

/// Redis rejects a zero expiry, so anything shorter than 1ms rounds up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}
