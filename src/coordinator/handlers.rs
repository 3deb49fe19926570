use std::future::Future;
use std::time::Duration;

use actix::{
    ActorFutureExt, Context, ContextFutureSpawner, Handler, ResponseFuture, WrapFuture,
};
use tracing::{error, info, warn};

use super::messages::{ArmAutoStart, ClearQueue, IsQueueOpen, RawCommand, ReloadWhitelist};
use super::{ops, Coordinator, CoordinatorError};
use crate::env::Settings;
use crate::protocol::Command;

impl Coordinator {
    /// Runs one command effect off the actor thread, logging any failure
    /// together with the payload that caused it. One bad message never
    /// takes the dispatcher down.
    fn spawn_logged<F>(&self, payload: String, fut: F)
    where
        F: Future<Output = Result<(), CoordinatorError>> + 'static,
    {
        actix::spawn(async move {
            if let Err(e) = fut.await {
                error!("Error processing bus message '{}': {}", payload, e);
            }
        });
    }

    fn reload_whitelist(&mut self) {
        match Settings::new() {
            Ok(settings) => {
                info!(
                    "Server whitelist reloaded: {} entries",
                    settings.coordinator.whitelist.len()
                );
                self.whitelist = settings.coordinator.whitelist;
            }
            Err(e) => error!("Failed to reload server whitelist: {}", e),
        }
    }
}

impl Handler<RawCommand> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: RawCommand, ctx: &mut Context<Self>) -> Self::Result {
        let command = match Command::parse(&msg.payload) {
            Ok(command) => command,
            Err(e) => {
                // Malformed and unknown payloads are dropped, nothing else.
                warn!("Dropping bus message '{}': {}", msg.payload, e);
                return;
            }
        };

        match command {
            Command::RouteGroup { server, players } => {
                self.spawn_logged(
                    msg.payload,
                    ops::route_group(self.directory.clone(), server, players),
                );
            }
            Command::RouteOne { server, player } => {
                self.spawn_logged(
                    msg.payload,
                    ops::route_one(self.directory.clone(), server, player),
                );
            }
            Command::Enqueue { player } => {
                self.spawn_logged(
                    msg.payload,
                    ops::enqueue_player(
                        self.store.clone(),
                        self.directory.clone(),
                        self.backend_channel.clone(),
                        self.queue_open,
                        player,
                    ),
                );
            }
            Command::ForceStart => {
                info!("Force start received; opening the queue");
                self.queue_open = true;
                actix::spawn(ops::broadcast_invitation(
                    self.directory.clone(),
                    self.whitelist.clone(),
                ));
                self.schedule_close(
                    ctx,
                    Duration::from_secs(self.settings.force_start_grace_seconds),
                    "force start grace period elapsed",
                );
            }
            Command::CancelGame { .. } => {
                self.spawn_logged(
                    msg.payload,
                    ops::cancel_game(
                        self.directory.clone(),
                        self.settings.primary_server.clone(),
                        self.settings.lobby_server.clone(),
                    ),
                );
            }
            Command::CancelGameEarly => {
                self.spawn_logged(msg.payload, ops::cancel_game_early(self.directory.clone()));
            }
            Command::Timeout { player } => {
                self.spawn_logged(
                    msg.payload,
                    ops::timeout_player(self.directory.clone(), player),
                );
            }
            Command::Disconnected { player } => {
                self.spawn_logged(msg.payload, ops::handle_disconnect(self.store.clone(), player));
            }
            Command::ReloadServers => self.reload_whitelist(),
        }
    }
}

impl Handler<ArmAutoStart> for Coordinator {
    type Result = ();

    fn handle(&mut self, _msg: ArmAutoStart, ctx: &mut Context<Self>) -> Self::Result {
        ops::try_auto_start(self.store.clone())
            .into_actor(self)
            .map(|fired, act, ctx| match fired {
                Ok(true) => act.open_for_auto_start(ctx),
                Ok(false) => {}
                Err(e) => error!("Auto-start evaluation failed: {}", e),
            })
            .spawn(ctx);
    }
}

impl Handler<ReloadWhitelist> for Coordinator {
    type Result = ();

    fn handle(&mut self, _msg: ReloadWhitelist, _ctx: &mut Context<Self>) -> Self::Result {
        self.reload_whitelist();
    }
}

impl Handler<ClearQueue> for Coordinator {
    type Result = ResponseFuture<()>;

    fn handle(&mut self, _msg: ClearQueue, _ctx: &mut Context<Self>) -> Self::Result {
        let store = self.store.clone();
        Box::pin(async move {
            if let Err(e) = store.clear_queue().await {
                error!("Failed to clear wait queue: {}", e);
            }
        })
    }
}

impl Handler<IsQueueOpen> for Coordinator {
    type Result = bool;

    fn handle(&mut self, _msg: IsQueueOpen, _ctx: &mut Context<Self>) -> Self::Result {
        self.queue_open
    }
}
