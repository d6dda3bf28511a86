use async_trait::async_trait;
use person_common::config::{ConsumerConfig, KafkaConfig};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message};
use tokio::sync::{mpsc, Mutex};

use crate::error::SourceError;

/// A stream of raw inbound payloads.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next payload. A message without a value yields an empty payload.
    async fn recv(&self) -> Result<Vec<u8>, SourceError>;
}

pub struct KafkaMessageSource {
    consumer: StreamConsumer,
}

impl KafkaMessageSource {
    pub fn new(
        common_config: &KafkaConfig,
        consumer_config: &ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("group.id", consumer_config.kafka_consumer_group.as_str())
            .set(
                "auto.offset.reset",
                &consumer_config.kafka_consumer_offset_reset,
            )
            .set(
                "enable.auto.commit",
                consumer_config.kafka_consumer_auto_commit.to_string(),
            )
            .set(
                "auto.commit.interval.ms",
                consumer_config
                    .kafka_consumer_auto_commit_interval_ms
                    .to_string(),
            );

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    async fn recv(&self) -> Result<Vec<u8>, SourceError> {
        let message = self.consumer.recv().await?;

        Ok(message.payload().map(<[u8]>::to_vec).unwrap_or_default())
    }
}

/// A `MessageSource` fed through a channel. Once every sender is gone it waits forever,
/// like a topic with nothing left to read.
pub struct MemorySource {
    receiver: Mutex<mpsc::UnboundedReceiver<Result<Vec<u8>, SourceError>>>,
}

impl MemorySource {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Vec<u8>, SourceError>>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (
            Self {
                receiver: Mutex::new(receiver),
            },
            sender,
        )
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn recv(&self) -> Result<Vec<u8>, SourceError> {
        match self.receiver.lock().await.recv().await {
            Some(message) => message,
            None => std::future::pending().await,
        }
    }
}
