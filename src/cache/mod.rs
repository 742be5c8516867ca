pub mod rate_limit;

use ::redis::{Client, RedisResult, aio::MultiplexedConnection, cmd};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Redis client plus one shared multiplexed connection, opened on first use
/// and reopened after a failure.
#[derive(Clone)]
pub struct RedisHandle {
    client: Client,
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisHandle {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Drops the shared connection so the next call reconnects.
    pub async fn reset(&self) {
        self.conn.lock().await.take();
    }
}

/// Redis健康检查
pub async fn redis_health_check(redis_client: &Client) -> Result<bool, AppError> {
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let pong: String = cmd("PING").query_async(&mut conn).await?;
    Ok(pong == "PONG")
}
