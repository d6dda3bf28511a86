use std::time::Duration;

use metrics::gauge;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, Producer};
use rdkafka::ClientConfig;
use tracing::{debug, error, info};

use crate::config::KafkaConfig;

/// Exports librdkafka statistics as gauges.
pub struct KafkaContext;

impl rdkafka::ClientContext for KafkaContext {
    fn stats(&self, stats: rdkafka::Statistics) {
        gauge!("person_kafka_callback_queue_depth").set(stats.replyq as f64);
        gauge!("person_kafka_producer_queue_depth").set(stats.msg_cnt as f64);
        gauge!("person_kafka_producer_queue_depth_limit").set(stats.msg_max as f64);
        gauge!("person_kafka_producer_queue_bytes").set(stats.msg_size as f64);
        gauge!("person_kafka_producer_queue_bytes_limit").set(stats.msg_size_max as f64);

        for (_, stats) in stats.brokers {
            let id_string = format!("{}", stats.nodeid);
            gauge!("person_kafka_broker_requests_pending", "broker" => id_string.clone())
                .set(stats.outbuf_cnt as f64);
            gauge!("person_kafka_broker_responses_awaiting", "broker" => id_string)
                .set(stats.waitresp_cnt as f64);
        }
    }
}

/// Build the producer used for dead-letter publishing and check that the brokers answer.
pub fn create_kafka_producer(
    config: &KafkaConfig,
) -> Result<FutureProducer<KafkaContext>, KafkaError> {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_hosts)
        .set("statistics.interval.ms", "10000")
        .set("linger.ms", config.kafka_producer_linger_ms.to_string())
        .set(
            "message.timeout.ms",
            config.kafka_message_timeout_ms.to_string(),
        )
        .set(
            "compression.codec",
            config.kafka_compression_codec.to_owned(),
        )
        .set(
            "queue.buffering.max.kbytes",
            (config.kafka_producer_queue_mib * 1024).to_string(),
        );

    if config.kafka_tls {
        client_config
            .set("security.protocol", "ssl")
            .set("enable.ssl.certificate.verification", "false");
    };

    debug!("rdkafka configuration: {:?}", client_config);
    let producer: FutureProducer<KafkaContext> = client_config.create_with_context(KafkaContext)?;

    // "Ping" the brokers by requesting metadata
    match producer
        .client()
        .fetch_metadata(None, Duration::from_secs(15))
    {
        Ok(metadata) => {
            info!(
                "Successfully connected to Kafka brokers. Found {} topics.",
                metadata.topics().len()
            );
        }
        Err(error) => {
            error!("Failed to fetch metadata from Kafka brokers: {:?}", error);
            return Err(error);
        }
    }

    Ok(producer)
}
