use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use person_common::kafka_producer::KafkaContext;
use person_common::models::NameRecord;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DeadLetterConfig;
use crate::error::DeadLetterError;

/// Dead letter published for a name record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub error: String,
    pub original_message: NameRecord,
}

/// Destination for messages the ingestion loop cannot process.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Forward a payload that could not be decoded, byte for byte.
    async fn decode_failure(&self, payload: &[u8]) -> Result<(), DeadLetterError>;

    async fn validation_failure(&self, failure: &ValidationFailure)
        -> Result<(), DeadLetterError>;
}

pub struct KafkaDeadLetterSink {
    producer: FutureProducer<KafkaContext>,
    decode_topic: String,
    validation_topic: String,
}

impl KafkaDeadLetterSink {
    pub fn new(producer: FutureProducer<KafkaContext>, config: &DeadLetterConfig) -> Self {
        Self {
            producer,
            decode_topic: config.kafka_decode_failure_topic.as_str().to_owned(),
            validation_topic: config.kafka_validation_failure_topic.as_str().to_owned(),
        }
    }

    async fn send(&self, topic: &str, payload: &[u8]) -> Result<(), DeadLetterError> {
        let delivery = self
            .producer
            .send_result(FutureRecord::<(), [u8]>::to(topic).payload(payload))
            .map_err(|(error, _)| DeadLetterError::Produce(error))?;

        match delivery.await {
            Ok(Ok((partition, offset))) => {
                debug!(topic, partition, offset, "dead letter delivered");
                Ok(())
            }
            Ok(Err((error, _))) => Err(DeadLetterError::Produce(error)),
            Err(_) => Err(DeadLetterError::Canceled),
        }
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterSink {
    async fn decode_failure(&self, payload: &[u8]) -> Result<(), DeadLetterError> {
        self.send(&self.decode_topic, payload).await
    }

    async fn validation_failure(
        &self,
        failure: &ValidationFailure,
    ) -> Result<(), DeadLetterError> {
        let payload = serde_json::to_vec(failure)?;

        self.send(&self.validation_topic, &payload).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadLetter {
    Decode(Vec<u8>),
    Validation(ValidationFailure),
}

/// Records dead letters in memory, optionally refusing every one of them.
#[derive(Clone, Default)]
pub struct MockDeadLetterSink {
    letters: Arc<Mutex<Vec<DeadLetter>>>,
    failing: bool,
}

impl MockDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(&mut self) -> Self {
        self.failing = true;
        self.clone()
    }

    pub fn letters(&self) -> Vec<DeadLetter> {
        match self.letters.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        match self.letters.lock() {
            Ok(mut guard) => guard.push(letter),
            Err(poisoned) => poisoned.into_inner().push(letter),
        }

        if self.failing {
            Err(DeadLetterError::Canceled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeadLetterSink for MockDeadLetterSink {
    async fn decode_failure(&self, payload: &[u8]) -> Result<(), DeadLetterError> {
        self.record(DeadLetter::Decode(payload.to_vec()))
    }

    async fn validation_failure(
        &self,
        failure: &ValidationFailure,
    ) -> Result<(), DeadLetterError> {
        self.record(DeadLetter::Validation(failure.clone()))
    }
}
