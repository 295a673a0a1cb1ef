use anyhow::{Context, Result};
use hydrant_domain::{IngestService, IngestServiceConfig};
use hydrant_worker::{run_mqtt_subscriber, CborEnvelopeDecoder, WorkerConfig};
use hydrant_nats::{NatsClient, NatsDocumentProducer};
use hydrant_postgres::{PostgresMetadataRepository, PostgresSettings};
use hydrant_redis::RedisFragmentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting hydrant-worker");

    if let Err(e) = run(config).await {
        error!(error = %e, "worker terminated");
        std::process::exit(1);
    }

    info!("Worker stopped gracefully");
}

async fn run(config: WorkerConfig) -> Result<()> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

    let metadata = PostgresMetadataRepository::connect(&PostgresSettings {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        user: config.postgres_user.clone(),
        password: config.postgres_password.clone(),
        pool_size: config.postgres_pool_size,
    })
    .context("Failed to create Postgres pool")?;
    metadata.ping().await.context("Failed to reach Postgres")?;
    let metadata = Arc::new(metadata);

    let fragment_ttl = match config.fragment_ttl_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let fragment_store =
        Arc::new(RedisFragmentStore::connect(&config.redis_url, fragment_ttl).await?);

    let nats = NatsClient::connect(&config.nats_url, startup_timeout).await?;
    nats.ensure_stream(&config.nats_stream, &config.publish_subject)
        .await?;
    let producer = Arc::new(NatsDocumentProducer::new(
        nats.create_publisher_client(),
        config.publish_subject.clone(),
    ));

    let service = Arc::new(IngestService::new(
        fragment_store,
        metadata,
        producer,
        IngestServiceConfig {
            default_sample_interval_us: config.default_sample_interval_us,
        },
    ));
    let decoder = Arc::new(CborEnvelopeDecoder);

    let token = CancellationToken::new();
    spawn_signal_handler(token.clone());

    run_mqtt_subscriber(&config, service, decoder, token).await
}

fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
        token.cancel();
    });
}
