use std::future::Future;
use std::time;

use metrics::histogram;
use person_common::models::{EnrichedRecord, NameRecord};
use tokio::time::timeout;

use crate::error::{Lookup, LookupError, LookupFailure};
use crate::lookup::DemographicsClient;

/// Resolves age, gender and nationality candidates for a validated name.
///
/// All three lookups run concurrently, each bounded by `timeout`. Enrichment is all or
/// nothing: the first failing lookup cancels the others and its error is returned.
pub struct Enricher<C> {
    client: C,
    timeout: time::Duration,
}

impl<C: DemographicsClient> Enricher<C> {
    pub fn new(client: C, timeout: time::Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn enrich(&self, record: &NameRecord) -> Result<EnrichedRecord, LookupError> {
        let start = time::Instant::now();
        let name = record.name.as_str();

        let (age, gender, nationality) = tokio::try_join!(
            self.bounded(Lookup::Age, self.client.age(name)),
            self.bounded(Lookup::Gender, self.client.gender(name)),
            self.bounded(Lookup::Nationality, self.client.nationality(name)),
        )?;

        histogram!("person_enrichment_duration_seconds").record(start.elapsed().as_secs_f64());

        Ok(EnrichedRecord {
            name: record.name.clone(),
            surname: record.surname.clone(),
            patronymic: record.patronymic.clone(),
            age,
            gender,
            nationality,
        })
    }

    async fn bounded<T>(
        &self,
        lookup: Lookup,
        request: impl Future<Output = Result<T, LookupFailure>>,
    ) -> Result<T, LookupError> {
        match timeout(self.timeout, request).await {
            Ok(result) => result.map_err(|failure| LookupError::new(lookup, failure)),
            Err(_) => Err(LookupError::new(
                lookup,
                LookupFailure::Timeout(self.timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use person_common::models::CountryProbability;

    use super::*;

    /// Delays the `slow` lookup by `delay` and fails every lookup listed in `failing`.
    #[derive(Clone, Default)]
    struct StubDemographics {
        delay: Option<time::Duration>,
        slow: Option<Lookup>,
        failing: Vec<Lookup>,
        nationality: Vec<CountryProbability>,
        completed: Arc<AtomicUsize>,
    }

    impl StubDemographics {
        async fn answer<T>(&self, lookup: Lookup, value: T) -> Result<T, LookupFailure> {
            if self.slow == Some(lookup) {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
            }
            self.completed.fetch_add(1, Ordering::SeqCst);

            if self.failing.contains(&lookup) {
                return Err(LookupFailure::Status(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(value)
        }
    }

    #[async_trait]
    impl DemographicsClient for StubDemographics {
        async fn age(&self, _name: &str) -> Result<i32, LookupFailure> {
            self.answer(Lookup::Age, 30).await
        }

        async fn gender(&self, _name: &str) -> Result<String, LookupFailure> {
            self.answer(Lookup::Gender, "female".to_owned()).await
        }

        async fn nationality(&self, _name: &str) -> Result<Vec<CountryProbability>, LookupFailure> {
            self.answer(Lookup::Nationality, self.nationality.clone())
                .await
        }
    }

    fn ann_lee() -> NameRecord {
        NameRecord {
            name: "Ann".to_owned(),
            surname: "Lee".to_owned(),
            patronymic: Some("Mae".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_enrich_combines_all_lookups() {
        let stub = StubDemographics {
            nationality: vec![
                CountryProbability {
                    country_id: "US".to_owned(),
                    probability: 0.8,
                },
                CountryProbability {
                    country_id: "GB".to_owned(),
                    probability: 0.8,
                },
            ],
            ..Default::default()
        };
        let enricher = Enricher::new(stub, time::Duration::from_secs(1));

        let enriched = enricher.enrich(&ann_lee()).await.unwrap();

        assert_eq!(enriched.name, "Ann");
        assert_eq!(enriched.patronymic.as_deref(), Some("Mae"));
        assert_eq!(enriched.age, 30);
        assert_eq!(enriched.gender, "female");
        assert_eq!(enriched.top_nationality(), Some("US"));
    }

    #[tokio::test]
    async fn test_any_failed_lookup_fails_enrichment() {
        for lookup in [Lookup::Age, Lookup::Gender, Lookup::Nationality] {
            let stub = StubDemographics {
                failing: vec![lookup],
                ..Default::default()
            };
            let enricher = Enricher::new(stub, time::Duration::from_secs(1));

            let err = enricher.enrich(&ann_lee()).await.unwrap_err();

            assert_eq!(err.lookup, lookup);
            assert!(matches!(err.source, LookupFailure::Status(_)));
        }
    }

    #[tokio::test]
    async fn test_first_failure_short_circuits_slow_lookups() {
        let stub = StubDemographics {
            delay: Some(time::Duration::from_secs(30)),
            slow: Some(Lookup::Age),
            failing: vec![Lookup::Nationality],
            ..Default::default()
        };
        let completed = stub.completed.clone();
        let enricher = Enricher::new(stub, time::Duration::from_secs(60));

        let started = time::Instant::now();
        let err = enricher.enrich(&ann_lee()).await.unwrap_err();

        assert_eq!(err.lookup, Lookup::Nationality);
        assert!(started.elapsed() < time::Duration::from_secs(5));
        // Gender and nationality answered, the slow age lookup never finished.
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_each_lookup_is_bounded_by_timeout() {
        let stub = StubDemographics {
            delay: Some(time::Duration::from_secs(30)),
            slow: Some(Lookup::Gender),
            ..Default::default()
        };
        let enricher = Enricher::new(stub, time::Duration::from_millis(50));

        let err = enricher.enrich(&ann_lee()).await.unwrap_err();

        assert_eq!(err.lookup, Lookup::Gender);
        assert!(matches!(err.source, LookupFailure::Timeout(_)));
        assert_eq!(err.to_string(), "gender lookup failed: timed out after 50ms");
    }
}
