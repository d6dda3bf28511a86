pub mod config;
pub mod dead_letter;
pub mod enricher;
pub mod error;
pub mod ingestor;
pub mod lookup;
pub mod persister;
pub mod source;
