use std::time;

use async_trait::async_trait;
use person_common::models::CountryProbability;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::LookupConfig;
use crate::error::LookupFailure;

#[derive(Debug, Deserialize)]
struct AgeResponse {
    age: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GenderResponse {
    gender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NationalityResponse {
    country: Vec<CountryProbability>,
}

/// Demographic predictions for a first name.
///
/// A name the services know nothing about gets an age of 0 and an empty gender.
#[async_trait]
pub trait DemographicsClient: Send + Sync {
    async fn age(&self, name: &str) -> Result<i32, LookupFailure>;

    async fn gender(&self, name: &str) -> Result<String, LookupFailure>;

    /// Candidate countries in the order the service returned them.
    async fn nationality(&self, name: &str) -> Result<Vec<CountryProbability>, LookupFailure>;
}

/// A `DemographicsClient` for the agify.io, genderize.io and nationalize.io APIs,
/// or anything serving the same responses at the configured base URLs.
pub struct HttpDemographicsClient {
    client: reqwest::Client,
    agify_url: Url,
    genderize_url: Url,
    nationalize_url: Url,
    timeout: time::Duration,
}

impl HttpDemographicsClient {
    pub fn new(config: &LookupConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.lookup_timeout.0;
        let client = reqwest::Client::builder()
            .user_agent("person-enricher")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            agify_url: config.agify_url.clone(),
            genderize_url: config.genderize_url.clone(),
            nationalize_url: config.nationalize_url.clone(),
            timeout,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, base: &Url, name: &str) -> Result<T, LookupFailure> {
        let response = self
            .client
            .get(base.clone())
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LookupFailure::Timeout(self.timeout)
                } else {
                    LookupFailure::Request(error)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupFailure::Status(status));
        }

        response.json::<T>().await.map_err(LookupFailure::Malformed)
    }
}

#[async_trait]
impl DemographicsClient for HttpDemographicsClient {
    async fn age(&self, name: &str) -> Result<i32, LookupFailure> {
        let response: AgeResponse = self.fetch(&self.agify_url, name).await?;

        Ok(response.age.unwrap_or_default())
    }

    async fn gender(&self, name: &str) -> Result<String, LookupFailure> {
        let response: GenderResponse = self.fetch(&self.genderize_url, name).await?;

        Ok(response.gender.unwrap_or_default())
    }

    async fn nationality(&self, name: &str) -> Result<Vec<CountryProbability>, LookupFailure> {
        let response: NationalityResponse = self.fetch(&self.nationalize_url, name).await?;

        Ok(response.country)
    }
}
