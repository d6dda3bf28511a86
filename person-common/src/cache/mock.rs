use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CacheError, Client};

/// An in-memory `Client` that records every call.
///
/// Values written with `setex` are readable by later `get` calls, so cache-aside
/// behavior can be exercised end to end. Canned errors take precedence over stored values.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    values: Arc<Mutex<HashMap<String, String>>>,
    get_errors: HashMap<String, CacheError>,
    setex_error: Option<CacheError>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRedisCall {
    Get(String),
    SetEx { key: String, seconds: u64 },
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_ret(&mut self, key: &str, value: &str) -> Self {
        self.lock(&self.values).insert(key.to_owned(), value.to_owned());
        self.clone()
    }

    pub fn get_err(&mut self, key: &str, err: CacheError) -> Self {
        self.get_errors.insert(key.to_owned(), err);
        self.clone()
    }

    pub fn setex_err(&mut self, err: CacheError) -> Self {
        self.setex_error = Some(err);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock(&self.calls).clone()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.lock(&self.values).get(key).cloned()
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, k: String) -> Result<String, CacheError> {
        self.lock(&self.calls).push(MockRedisCall::Get(k.clone()));

        if let Some(err) = self.get_errors.get(&k) {
            return Err(err.clone());
        }

        self.lock(&self.values)
            .get(&k)
            .cloned()
            .ok_or(CacheError::NotFound)
    }

    async fn setex(&self, k: String, v: String, seconds: u64) -> Result<(), CacheError> {
        self.lock(&self.calls).push(MockRedisCall::SetEx {
            key: k.clone(),
            seconds,
        });

        if let Some(err) = &self.setex_error {
            return Err(err.clone());
        }

        self.lock(&self.values).insert(k, v);
        Ok(())
    }
}
