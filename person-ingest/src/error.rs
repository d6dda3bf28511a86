use std::fmt;
use std::time;

use person_common::store::StoreError;
use rdkafka::error::KafkaError;
use thiserror::Error;

/// The demographic lookups performed for every name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Age,
    Gender,
    Nationality,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Age => "age",
            Lookup::Gender => "gender",
            Lookup::Nationality => "nationality",
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single lookup did not produce a value.
#[derive(Error, Debug)]
pub enum LookupFailure {
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(time::Duration),
    #[error("responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(reqwest::Error),
}

/// Enrichment of a name failed because one of its lookups failed.
#[derive(Error, Debug)]
#[error("{lookup} lookup failed: {source}")]
pub struct LookupError {
    pub lookup: Lookup,
    pub source: LookupFailure,
}

impl LookupError {
    pub fn new(lookup: Lookup, source: LookupFailure) -> Self {
        Self { lookup, source }
    }
}

#[derive(Error, Debug)]
#[error("failed to persist enriched record: {0}")]
pub struct PersistenceError(#[from] pub StoreError);

#[derive(Error, Debug)]
pub enum DeadLetterError {
    #[error("failed to serialize dead letter: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to produce dead letter to kafka: {0}")]
    Produce(KafkaError),
    #[error("dead letter delivery was canceled")]
    Canceled,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read from kafka: {0}")]
    Kafka(#[from] KafkaError),
}
