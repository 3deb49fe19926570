use std::time::{Duration, Instant};

use actix::{
    dev::ContextFutureSpawner, Actor, AsyncContext, Context, Handler, Message, Recipient,
    WrapFuture,
};
use futures_util::stream::StreamExt;
use redis::Client as RedisClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::coordinator::messages::RawCommand;
use crate::env::RedisSettings;

#[derive(Message)]
#[rtype(result = "()")]
struct ResetReconnectAttempts;

#[derive(Message)]
#[rtype(result = "()")]
struct RecordFailure;

#[derive(Message)]
#[rtype(result = "()")]
struct Connect;

/// Holds the single Redis Pub/Sub connection on the inbound command channel
/// and forwards every payload to the coordinator. Reconnects with a capped
/// exponential backoff; after `max_reconnect_attempts` consecutive failures
/// it cancels the shutdown token so the process exits instead of spinning.
pub struct RedisSubscriber {
    redis_client: RedisClient,
    coordinator: Recipient<RawCommand>,
    channel: String,
    settings: RedisSettings,
    shutdown: CancellationToken,
    reconnect_attempts: u32,
    consecutive_failures: u32,
    last_failure_time: Option<Instant>,
}

impl RedisSubscriber {
    pub fn new(
        redis_client: RedisClient,
        coordinator: Recipient<RawCommand>,
        channel: String,
        settings: RedisSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            redis_client,
            coordinator,
            channel,
            settings,
            shutdown,
            reconnect_attempts: 0,
            consecutive_failures: 0,
            last_failure_time: None,
        }
    }

    fn connect_and_subscribe(&mut self, ctx: &mut Context<Self>) {
        let client = self.redis_client.clone();
        let coordinator = self.coordinator.clone();
        let channel = self.channel.clone();
        let shutdown = self.shutdown.clone();
        let self_addr = ctx.address();

        async move {
            if shutdown.is_cancelled() {
                info!("Shutdown requested; not resubscribing.");
                return;
            }

            let conn = match client.get_async_connection().await {
                Ok(c) => c,
                Err(e) => {
                    error!("RedisSubscriber failed to get connection: {}", e);
                    self_addr.do_send(RecordFailure);
                    self_addr.do_send(Connect);
                    return;
                }
            };

            let mut pubsub = conn.into_pubsub();
            if let Err(e) = pubsub.subscribe(&channel).await {
                error!("RedisSubscriber failed to subscribe: {}", e);
                self_addr.do_send(RecordFailure);
                self_addr.do_send(Connect);
                return;
            }
            info!("Successfully subscribed to '{}'", channel);
            self_addr.do_send(ResetReconnectAttempts);

            let mut stream = pubsub.on_message();
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Shutdown requested; ending subscription loop.");
                        return;
                    }
                    msg = stream.next() => {
                        let Some(msg) = msg else { break };
                        let payload: String = match msg.get_payload() {
                            Ok(p) => p,
                            Err(e) => {
                                warn!("Ignoring undecodable bus message: {}", e);
                                continue;
                            }
                        };
                        // Handling failures are logged by the coordinator
                        // with the payload; they never reach this loop.
                        coordinator.do_send(RawCommand { payload });
                    }
                }
            }

            warn!("Redis Pub/Sub stream ended. Attempting to reconnect...");
            self_addr.do_send(Connect);
        }
        .into_actor(self)
        .wait(ctx);
    }
}

impl Actor for RedisSubscriber {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("RedisSubscriber actor started.");
        self.connect_and_subscribe(ctx);
    }
}

impl Handler<ResetReconnectAttempts> for RedisSubscriber {
    type Result = ();

    fn handle(&mut self, _msg: ResetReconnectAttempts, _ctx: &mut Context<Self>) -> Self::Result {
        self.reconnect_attempts = 0;
        self.consecutive_failures = 0;
        self.last_failure_time = None;
    }
}

impl Handler<RecordFailure> for RedisSubscriber {
    type Result = ();

    fn handle(&mut self, _msg: RecordFailure, _ctx: &mut Context<Self>) -> Self::Result {
        self.consecutive_failures += 1;
        self.last_failure_time = Some(Instant::now());
        warn!(
            "Redis connection failure recorded. Consecutive failures: {}",
            self.consecutive_failures
        );
    }
}

impl Handler<Connect> for RedisSubscriber {
    type Result = ();

    fn handle(&mut self, _msg: Connect, ctx: &mut Context<Self>) -> Self::Result {
        self.reconnect_attempts += 1;

        if self.reconnect_attempts > self.settings.max_reconnect_attempts {
            error!(
                "Max Redis reconnect attempts ({}) reached. Shutting down.",
                self.settings.max_reconnect_attempts
            );
            self.shutdown.cancel();
            return;
        }

        let delay = Duration::from_millis(std::cmp::min(
            self.settings.max_reconnect_delay_ms,
            self.settings.initial_reconnect_delay_ms
                * 2u64.saturating_pow(self.reconnect_attempts - 1),
        ));
        info!(
            "Reconnect attempt {} scheduled in {:?}.",
            self.reconnect_attempts, delay
        );
        ctx.run_later(delay, |act, ctx| {
            act.connect_and_subscribe(ctx);
        });
    }
}
