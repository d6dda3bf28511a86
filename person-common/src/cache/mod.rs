use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod mock;
mod redis;

pub use self::mock::{MockRedisCall, MockRedisClient};
pub use self::redis::RedisClient;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("not found in redis")]
    NotFound,
    #[error("timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<::redis::RedisError>),
}

impl From<::redis::RedisError> for CacheError {
    fn from(err: ::redis::RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout
        } else {
            CacheError::Redis(Arc::new(err))
        }
    }
}

/// The handful of key-value operations the user listing cache needs.
#[async_trait]
pub trait Client {
    /// Fetch a string value. A missing key is `CacheError::NotFound`.
    async fn get(&self, k: String) -> Result<String, CacheError>;

    /// Store a string value that expires after `seconds`.
    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CacheError>;
}
