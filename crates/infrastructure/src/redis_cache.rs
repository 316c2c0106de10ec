use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use settings_core::{SettingsError, SettingsResult};
use settings_domain::SettingsCache;
use tokio::time::sleep;
use tracing::{debug, warn};

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Redis-backed settings cache.
pub struct RedisSettingsCache {
    client: Client,
}

impl RedisSettingsCache {
    /// Connect to Redis and verify the connection with a PING.
    pub async fn new(redis_url: &str) -> SettingsResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| SettingsError::Cache(format!("Failed to create Redis client: {e}")))?;

        let cache = Self { client };
        cache.test_connection().await?;
        debug!("Successfully connected to Redis cache backend");

        Ok(cache)
    }

    async fn test_connection(&self) -> SettingsResult<()> {
        let mut conn = self.connection().await?;
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| SettingsError::Cache(format!("Redis PING failed: {e}")))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(SettingsError::Cache(format!(
                "Unexpected PING response: {response}"
            )))
        }
    }

    async fn connection(&self) -> SettingsResult<MultiplexedConnection> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    if attempt > 0 {
                        debug!("Reconnected to Redis after {} attempts", attempt + 1);
                    }
                    return Ok(conn);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRY_ATTEMPTS - 1 {
                        warn!(
                            "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}s...",
                            attempt + 1,
                            MAX_RETRY_ATTEMPTS,
                            last_error.as_ref().unwrap(),
                            RETRY_DELAY.as_secs()
                        );
                        sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(SettingsError::Cache(format!(
            "Failed to connect to Redis after {} attempts. Last error: {}",
            MAX_RETRY_ATTEMPTS,
            last_error.map_or("Unknown".to_string(), |e| e.to_string())
        )))
    }
}

#[async_trait]
impl SettingsCache for RedisSettingsCache {
    async fn get(&self, key: &str) -> SettingsResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let payload: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| SettingsError::Cache(format!("Redis GET failed: {e}")))?;
        Ok(payload)
    }

    async fn set(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> SettingsResult<()> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => {
                // SETEX rejects zero; enforce a floor of one second
                let seconds = ttl.as_secs().max(1);
                let _: () = conn
                    .set_ex(key, payload, seconds)
                    .await
                    .map_err(|e| SettingsError::Cache(format!("Redis SETEX failed: {e}")))?;
            }
            None => {
                let _: () = conn
                    .set(key, payload)
                    .await
                    .map_err(|e| SettingsError::Cache(format!("Redis SET failed: {e}")))?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> SettingsResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| SettingsError::Cache(format!("Redis DEL failed: {e}")))?;
        Ok(())
    }
}
