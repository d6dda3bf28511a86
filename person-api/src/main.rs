use std::sync::Arc;

use axum::Router;
use envconfig::Envconfig;
use eyre::{Result, WrapErr};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use person_common::cache::RedisClient;
use person_common::kafka_producer::create_kafka_producer;
use person_common::metrics::{serve, setup_metrics_recorder, setup_metrics_routes};
use person_common::store::{PgUserStore, UserStore};
use person_ingest::dead_letter::KafkaDeadLetterSink;
use person_ingest::enricher::Enricher;
use person_ingest::ingestor::Ingestor;
use person_ingest::lookup::HttpDemographicsClient;
use person_ingest::persister::Persister;
use person_ingest::source::KafkaMessageSource;

use config::Config;
use handlers::AppState;
use query::UserQueryService;

mod config;
mod error;
mod handlers;
mod query;

/// Cancel `shutdown` on SIGTERM or SIGINT.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
        _ = shutdown.cancelled() => return,
    };

    tracing::info!("Shutting down gracefully...");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::init_from_env().wrap_err("failed to load configuration from env")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store: Arc<dyn UserStore> = Arc::new(
        PgUserStore::new(
            &config.database_url,
            config.max_pg_connections,
            config.storage_timeout.0,
        )
        .await
        .wrap_err("failed to connect to postgres")?,
    );
    let cache = RedisClient::new(&config.redis_url, config.cache_timeout.0)
        .await
        .wrap_err("failed to connect to redis")?;

    let state = AppState {
        store: store.clone(),
        users: Arc::new(UserQueryService::new(store.clone(), Arc::new(cache))),
    };
    let recorder_handle = setup_metrics_recorder().wrap_err("failed to install metrics recorder")?;
    let app = handlers::add_routes(Router::new(), state, config.max_body_size);
    let app = setup_metrics_routes(app, recorder_handle).layer(TraceLayer::new_for_http());

    let producer =
        create_kafka_producer(&config.kafka).wrap_err("failed to create kafka producer")?;
    let source = KafkaMessageSource::new(&config.kafka, &config.consumer)
        .wrap_err("failed to create kafka consumer")?;
    let client = HttpDemographicsClient::new(&config.lookups)
        .wrap_err("failed to construct lookup client")?;
    let ingestor = Ingestor::new(
        source,
        Enricher::new(client, config.lookups.lookup_timeout.0),
        Persister::new(store),
        Arc::new(KafkaDeadLetterSink::new(producer, &config.dead_letters)),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let bind = config.bind();
    tracing::info!("Listening on {}", bind);
    let server = async {
        let served = serve(app, &bind, shutdown.clone().cancelled_owned()).await;
        // Stop ingestion whenever the server stops, including on a failed bind.
        shutdown.cancel();
        served
    };

    let (served, ()) = tokio::join!(server, ingestor.run(shutdown.clone()));
    served.wrap_err("http server failed")?;

    Ok(())
}
