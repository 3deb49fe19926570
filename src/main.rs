use std::sync::Arc;

use actix::{Actor, System};
use arena_coordinator::{
    coordinator::{messages::ClearQueue, Coordinator},
    directory::HttpSessionDirectory,
    env::Settings,
    pubsub::RedisSubscriber,
    store::RedisStore,
    LoggerManager,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    // 1. Environment and settings
    dotenv::dotenv().ok();
    let settings = Settings::new().expect("Failed to load settings");

    // 2. Logger
    let _logger_manager = LoggerManager::setup(&settings);
    info!("Logger initialized");

    // 3. Redis client and pooled connection manager
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let redis_client =
        redis::Client::open(redis_url.clone()).expect("Failed to create Redis client");
    let redis_conn_manager = redis::aio::ConnectionManager::new(redis_client.clone())
        .await
        .expect("Failed to create Redis connection manager");
    info!("Redis connection established: {}", redis_url);

    // 4. Global shutdown token
    let shutdown_token = CancellationToken::new();

    // 5. Store and session directory
    let store = Arc::new(RedisStore::new(
        redis_conn_manager,
        settings.coordinator.queue_key.clone(),
        settings.coordinator.points_key.clone(),
    ));
    let directory = Arc::new(
        HttpSessionDirectory::new(&settings.directory)
            .expect("Failed to create session directory client"),
    );

    // 6. Coordinator actor
    let coordinator_addr = Coordinator::new(
        store,
        directory,
        settings.coordinator.clone(),
        settings.channels.backend.clone(),
    )
    .start();
    info!("Coordinator actor started");

    // 7. Subscription loop on the inbound command channel
    RedisSubscriber::new(
        redis_client,
        coordinator_addr.clone().recipient(),
        settings.channels.inbound.clone(),
        settings.redis.clone(),
        shutdown_token.clone(),
    )
    .start();
    info!("Subscribed to inbound channel '{}'", settings.channels.inbound);

    // 8. Wait for ctrl-c or a subscriber giving up
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received. Initiating graceful shutdown...");
            shutdown_token.cancel();
        }
        _ = shutdown_token.cancelled() => {
            error!("Shutdown requested internally. Stopping...");
        }
    }

    // 9. Clear the wait queue before the process exits; a queue promised by
    // a dead coordinator must not survive it.
    if let Err(e) = coordinator_addr.send(ClearQueue).await {
        error!("Failed to clear wait queue during shutdown: {}", e);
    }

    System::current().stop();
    info!("System has shut down gracefully");
    Ok(())
}
