use envconfig::Envconfig;
use person_common::config::{EnvMsDuration, NonEmptyString};

#[derive(Envconfig, Clone)]
pub struct LookupConfig {
    #[envconfig(default = "https://api.agify.io")]
    pub agify_url: url::Url,

    #[envconfig(default = "https://api.genderize.io")]
    pub genderize_url: url::Url,

    #[envconfig(default = "https://api.nationalize.io")]
    pub nationalize_url: url::Url,

    // Applied to each of the three lookups independently.
    #[envconfig(default = "5000")]
    pub lookup_timeout: EnvMsDuration,
}

#[derive(Envconfig, Clone)]
pub struct DeadLetterConfig {
    // Messages whose payload is not a JSON name record.
    #[envconfig(default = "FIO_FAILED")]
    pub kafka_decode_failure_topic: NonEmptyString,

    // Name records missing a required field.
    #[envconfig(default = "FIO_FAILED")]
    pub kafka_validation_failure_topic: NonEmptyString,
}
