use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::time::timeout;

use super::{CacheError, Client};

/// A `Client` backed by a single multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisClient {
    connection: redis::aio::MultiplexedConnection,
    timeout: Duration,
}

impl RedisClient {
    pub async fn new(addr: &str, command_timeout: Duration) -> Result<RedisClient, CacheError> {
        let client = redis::Client::open(addr)?;

        let connection = timeout(command_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout)??;

        Ok(RedisClient {
            connection,
            timeout: command_timeout,
        })
    }
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<String, CacheError> {
        let mut conn = self.connection.clone();

        let value = timeout(self.timeout, conn.get::<_, Option<String>>(k))
            .await
            .map_err(|_| CacheError::Timeout)??;

        value.ok_or(CacheError::NotFound)
    }

    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();

        let mut command = redis::cmd("SETEX");
        command.arg(k).arg(seconds).arg(v);

        timeout(self.timeout, command.query_async::<_, ()>(&mut conn))
            .await
            .map_err(|_| CacheError::Timeout)??;

        Ok(())
    }
}
