pub mod cache;
pub mod config;
pub mod kafka_producer;
pub mod metrics;
pub mod models;
pub mod store;
pub mod validation;
