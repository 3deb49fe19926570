use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::CoordinatorError;
use crate::directory::SessionDirectory;
use crate::protocol::{
    confirm_queue, GAME_CANCELED_NOTICE, JOIN_INVITATION, QUEUE_CLOSED_NOTICE, TIMEOUT_REASON,
};
use crate::store::SharedStore;

/// `teleportPlayersTo`: hand a group off to one server. A missing server is
/// a no-op; a missing player only skips that player.
pub async fn route_group(
    directory: Arc<dyn SessionDirectory>,
    server: String,
    players: Vec<String>,
) -> Result<(), CoordinatorError> {
    if !directory.server_exists(&server).await? {
        debug!("Ignoring group route to unknown server '{}'", server);
        return Ok(());
    }

    for name in players {
        match directory.resolve_name(&name).await? {
            Some(player) => {
                if let Err(e) = directory.transfer(player.id, &server).await {
                    warn!("Failed to hand {} off to {}: {}", name, server, e);
                }
            }
            None => debug!("Skipping offline player '{}' in group route", name),
        }
    }
    Ok(())
}

/// `teleportTo`: single-target hand-off; silently skipped unless both the
/// player and the server resolve.
pub async fn route_one(
    directory: Arc<dyn SessionDirectory>,
    server: String,
    player_name: String,
) -> Result<(), CoordinatorError> {
    let player = directory.resolve_name(&player_name).await?;
    let server_known = directory.server_exists(&server).await?;

    if let (Some(player), true) = (player, server_known) {
        directory.transfer(player.id, &server).await?;
    }
    Ok(())
}

/// `queue`: append to the wait queue and confirm, or tell the player the
/// queue is closed.
pub async fn enqueue_player(
    store: Arc<dyn SharedStore>,
    directory: Arc<dyn SessionDirectory>,
    backend_channel: String,
    queue_open: bool,
    player: Uuid,
) -> Result<(), CoordinatorError> {
    if queue_open {
        // The insert is idempotent at the store, so concurrently dispatched
        // confirms for the same player keep a single entry.
        store.enqueue(player).await?;
        store
            .publish(&backend_channel, &confirm_queue(player))
            .await?;
        return Ok(());
    }

    match directory.resolve_id(player).await? {
        Some(_) => directory.send_to_player(player, QUEUE_CLOSED_NOTICE).await?,
        None => warn!("Attempted to send message to offline player: {}", player),
    }
    Ok(())
}

/// Invites every whitelisted backend server to the opening queue.
pub async fn broadcast_invitation(directory: Arc<dyn SessionDirectory>, whitelist: Vec<String>) {
    for server in whitelist {
        if let Err(e) = directory.broadcast_to_server(&server, JOIN_INVITATION).await {
            warn!("Failed to send join invitation to {}: {}", server, e);
        }
    }
}

/// `gameCanceled`: return everyone on the arena server to the lobby with a
/// cancellation notice.
pub async fn cancel_game(
    directory: Arc<dyn SessionDirectory>,
    primary_server: String,
    lobby_server: String,
) -> Result<(), CoordinatorError> {
    if !directory.server_exists(&lobby_server).await?
        || !directory.server_exists(&primary_server).await?
    {
        warn!(
            "Cannot cancel game: server '{}' or '{}' is not registered",
            primary_server, lobby_server
        );
        return Ok(());
    }

    for player in directory.players_on(&primary_server).await? {
        if let Err(e) = directory.transfer(player.id, &lobby_server).await {
            warn!("Failed to return {} to {}: {}", player.name, lobby_server, e);
        }
        if let Err(e) = directory
            .send_to_player(player.id, GAME_CANCELED_NOTICE)
            .await
        {
            warn!("Failed to notify {} of cancellation: {}", player.name, e);
        }
    }
    Ok(())
}

/// `gameCanceledEarly`: notice to every registered backend server.
pub async fn cancel_game_early(
    directory: Arc<dyn SessionDirectory>,
) -> Result<(), CoordinatorError> {
    for server in directory.list_servers().await? {
        if let Err(e) = directory
            .broadcast_to_server(&server, GAME_CANCELED_NOTICE)
            .await
        {
            warn!("Failed to send cancellation notice to {}: {}", server, e);
        }
    }
    Ok(())
}

/// `timeout`: disconnect the session if it is still live, otherwise no-op.
pub async fn timeout_player(
    directory: Arc<dyn SessionDirectory>,
    player: Uuid,
) -> Result<(), CoordinatorError> {
    if directory.resolve_id(player).await?.is_some() {
        directory.disconnect(player, TIMEOUT_REASON).await?;
    }
    Ok(())
}

/// Player disconnect: drop the player from the wait queue and the in-game
/// map. Both checks run unconditionally; a player may be in neither, one,
/// or transiently both.
pub async fn handle_disconnect(
    store: Arc<dyn SharedStore>,
    player: Uuid,
) -> Result<(), CoordinatorError> {
    if store.is_queued(player).await? {
        store.remove_queued(player).await?;
    }
    if store.is_in_game(player).await? {
        store.remove_from_game(player).await?;
    }
    Ok(())
}

/// Auto-start arming: fires only with no match in progress, and clears the
/// wait queue before the window opens. Returns whether the window fired;
/// the caller opens the queue, broadcasts and schedules the closing task.
pub async fn try_auto_start(store: Arc<dyn SharedStore>) -> Result<bool, CoordinatorError> {
    if store.count_in_game().await? > 0 {
        return Ok(false);
    }

    info!("Auto-start window reached; opening the queue");
    if let Err(e) = store.clear_queue().await {
        // A type mismatch refuses the delete but must not block the event.
        error!("Failed to clear wait queue at auto-start: {}", e);
    }
    Ok(true)
}
