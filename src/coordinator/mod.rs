use std::sync::Arc;
use std::time::Duration;

use actix::{Actor, AsyncContext, Context};
use chrono::Local;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::directory::{DirectoryError, SessionDirectory};
use crate::env::CoordinatorSettings;
use crate::protocol::START;
use crate::store::{SharedStore, StoreError};

use self::autostart::RefireGuard;
use self::messages::ArmAutoStart;

pub mod autostart;
pub mod handlers;
pub mod messages;
pub mod ops;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Owns the queue lifecycle. All `queue_open` reads and writes happen on
/// this actor (message handlers and `run_later` closures), so the flag
/// never needs a lock.
pub struct Coordinator {
    pub(crate) store: Arc<dyn SharedStore>,
    pub(crate) directory: Arc<dyn SessionDirectory>,
    pub(crate) settings: CoordinatorSettings,
    pub(crate) backend_channel: String,
    pub(crate) whitelist: Vec<String>,
    pub(crate) queue_open: bool,
    refire_guard: RefireGuard,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn SharedStore>,
        directory: Arc<dyn SessionDirectory>,
        settings: CoordinatorSettings,
        backend_channel: String,
    ) -> Self {
        let whitelist = settings.whitelist.clone();
        Self {
            store,
            directory,
            settings,
            backend_channel,
            whitelist,
            queue_open: false,
            refire_guard: RefireGuard::default(),
        }
    }

    /// Schedules the one-shot task that closes the queue and publishes
    /// `start` to the backend channel. Never cancelled once scheduled.
    pub(crate) fn schedule_close(
        &self,
        ctx: &mut Context<Self>,
        delay: Duration,
        origin: &'static str,
    ) {
        ctx.run_later(delay, move |act, _ctx| {
            info!("Closing the queue ({})", origin);
            act.queue_open = false;

            let store = act.store.clone();
            let channel = act.backend_channel.clone();
            actix::spawn(async move {
                if let Err(e) = store.publish(&channel, START).await {
                    error!("Failed to publish start command: {}", e);
                }
            });
        });
    }

    /// Per-second tick: fires the auto-start sequence on an exact wall-clock
    /// match. A tick delayed past the window is skipped, never replayed.
    fn evaluate_auto_start(&mut self, ctx: &mut Context<Self>) {
        let now = Local::now();
        if autostart::window_matches(&now) && self.refire_guard.try_fire(&now) {
            ctx.notify(ArmAutoStart);
        }
    }

    /// Continuation of a fired auto-start window: open the queue, invite the
    /// whitelisted servers and arm the closing task.
    pub(crate) fn open_for_auto_start(&mut self, ctx: &mut Context<Self>) {
        self.queue_open = true;
        actix::spawn(ops::broadcast_invitation(
            self.directory.clone(),
            self.whitelist.clone(),
        ));

        // The closing task belongs to the arena host; without it on the
        // whitelist there is nothing to start.
        if self
            .whitelist
            .iter()
            .any(|s| s == &self.settings.primary_server)
        {
            self.schedule_close(
                ctx,
                Duration::from_secs(self.settings.autostart_close_delay_seconds),
                "auto-start window elapsed",
            );
        } else {
            warn!(
                "Primary server '{}' is not whitelisted; queue opened without a closing task",
                self.settings.primary_server
            );
        }
    }
}

impl Actor for Coordinator {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Coordinator actor started.");
        ctx.run_interval(
            Duration::from_secs(self.settings.autostart_tick_interval_seconds),
            |act, ctx| act.evaluate_auto_start(ctx),
        );
    }
}
