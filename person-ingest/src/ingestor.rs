use std::sync::Arc;

use metrics::counter;
use person_common::models::{NameRecord, PersistedUser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dead_letter::{DeadLetterSink, ValidationFailure};
use crate::enricher::Enricher;
use crate::lookup::DemographicsClient;
use crate::persister::Persister;
use crate::source::MessageSource;

/// What happened to a single inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Persisted(PersistedUser),
    /// Forwarded to a dead-letter topic, labelled with the failed stage.
    DeadLettered(&'static str),
    /// Discarded after a failure, labelled with the failed stage.
    Dropped(&'static str),
}

/// Moves messages from a `MessageSource` through decoding, validation, enrichment and
/// persistence, one message at a time in delivery order.
pub struct Ingestor<S, C> {
    source: S,
    enricher: Enricher<C>,
    persister: Persister,
    dead_letters: Arc<dyn DeadLetterSink>,
}

impl<S: MessageSource, C: DemographicsClient> Ingestor<S, C> {
    pub fn new(
        source: S,
        enricher: Enricher<C>,
        persister: Persister,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            source,
            enricher,
            persister,
            dead_letters,
        }
    }

    /// Process messages until `shutdown` is cancelled.
    ///
    /// Cancellation is observed before every read and while waiting for a message. A
    /// message that has been read is always processed to completion.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("starting ingestion loop");

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.source.recv() => received,
            };

            match received {
                Ok(payload) => {
                    self.process(&payload).await;
                }
                Err(e) => {
                    error!(error = %e, "failed to read from queue");
                }
            }
        }

        info!("ingestion loop stopped");
    }

    pub async fn process(&self, payload: &[u8]) -> Outcome {
        counter!("person_ingest_messages_total").increment(1);

        let record: NameRecord = match serde_json::from_slice(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "failed to decode message");
                let published = self.dead_letters.decode_failure(payload).await;
                return self.dead_lettered("decode", published);
            }
        };

        if let Err(e) = record.validate() {
            warn!(error = %e, "invalid name record");
            let failure = ValidationFailure {
                error: e.to_string(),
                original_message: record,
            };
            let published = self.dead_letters.validation_failure(&failure).await;
            return self.dead_lettered("validation", published);
        }

        let enriched = match self.enricher.enrich(&record).await {
            Ok(enriched) => enriched,
            Err(e) => {
                error!(error = %e, lookup = %e.lookup, "failed to enrich name record");
                return dropped("lookup");
            }
        };

        match self.persister.persist(&enriched).await {
            Ok(user) => {
                info!(id = user.id, "persisted enriched user");
                counter!("person_ingest_persisted_total").increment(1);
                Outcome::Persisted(user)
            }
            Err(e) => {
                error!(error = %e, "failed to persist enriched user");
                dropped("persistence")
            }
        }
    }

    fn dead_lettered(
        &self,
        stage: &'static str,
        published: Result<(), crate::error::DeadLetterError>,
    ) -> Outcome {
        match published {
            Ok(()) => {
                counter!("person_ingest_dead_lettered_total", "stage" => stage).increment(1);
                Outcome::DeadLettered(stage)
            }
            Err(e) => {
                error!(error = %e, stage, "failed to publish dead letter");
                dropped("dead_letter")
            }
        }
    }
}

fn dropped(stage: &'static str) -> Outcome {
    counter!("person_ingest_dropped_total", "stage" => stage).increment(1);
    Outcome::Dropped(stage)
}
