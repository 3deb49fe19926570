//! In-memory doubles for the shared store and the session directory, used
//! to exercise command handling without Redis or the routing proxy.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use arena_coordinator::directory::{DirectoryError, PlayerRef, SessionDirectory};
use arena_coordinator::store::{SharedStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    pub queue: Mutex<Vec<Uuid>>,
    pub in_game: Mutex<HashSet<Uuid>>,
    pub published: Mutex<Vec<(String, String)>>,
    /// Names of mutating store calls, in order.
    pub writes: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn with_in_game(players: &[Uuid]) -> Self {
        let store = Self::default();
        store.in_game.lock().unwrap().extend(players.iter().copied());
        store
    }

    pub fn queued(&self) -> Vec<Uuid> {
        self.queue.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<&'static str> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn enqueue(&self, player: Uuid) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push("enqueue");
        // One lock span covers the check and the push, mirroring the atomic
        // insert of the production store.
        let mut queue = self.queue.lock().unwrap();
        if !queue.contains(&player) {
            queue.push(player);
        }
        Ok(())
    }

    async fn remove_queued(&self, player: Uuid) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push("remove_queued");
        self.queue.lock().unwrap().retain(|id| *id != player);
        Ok(())
    }

    async fn is_queued(&self, player: Uuid) -> Result<bool, StoreError> {
        Ok(self.queue.lock().unwrap().contains(&player))
    }

    async fn clear_queue(&self) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push("clear_queue");
        self.queue.lock().unwrap().clear();
        Ok(())
    }

    async fn is_in_game(&self, player: Uuid) -> Result<bool, StoreError> {
        Ok(self.in_game.lock().unwrap().contains(&player))
    }

    async fn remove_from_game(&self, player: Uuid) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push("remove_from_game");
        self.in_game.lock().unwrap().remove(&player);
        Ok(())
    }

    async fn count_in_game(&self) -> Result<usize, StoreError> {
        Ok(self.in_game.lock().unwrap().len())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), payload.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    pub servers: Mutex<Vec<String>>,
    pub online: Mutex<HashMap<Uuid, PlayerRef>>,
    /// player id -> server the player is currently connected to.
    pub locations: Mutex<HashMap<Uuid, String>>,
    pub transfers: Mutex<Vec<(Uuid, String)>>,
    pub messages: Mutex<Vec<(Uuid, String)>>,
    pub broadcasts: Mutex<Vec<(String, String)>>,
    pub disconnects: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryDirectory {
    pub fn with_servers(names: &[&str]) -> Self {
        let directory = Self::default();
        directory
            .servers
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        directory
    }

    pub fn add_player(&self, name: &str, server: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.online.lock().unwrap().insert(
            id,
            PlayerRef {
                id,
                name: name.to_string(),
            },
        );
        self.locations
            .lock()
            .unwrap()
            .insert(id, server.to_string());
        id
    }

    pub fn transfers(&self) -> Vec<(Uuid, String)> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(Uuid, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<(String, String)> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> Vec<(Uuid, String)> {
        self.disconnects.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionDirectory for MemoryDirectory {
    async fn server_exists(&self, server: &str) -> Result<bool, DirectoryError> {
        Ok(self.servers.lock().unwrap().iter().any(|s| s == server))
    }

    async fn list_servers(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.servers.lock().unwrap().clone())
    }

    async fn players_on(&self, server: &str) -> Result<Vec<PlayerRef>, DirectoryError> {
        let locations = self.locations.lock().unwrap();
        let online = self.online.lock().unwrap();
        Ok(locations
            .iter()
            .filter(|(_, s)| s.as_str() == server)
            .filter_map(|(id, _)| online.get(id).cloned())
            .collect())
    }

    async fn resolve_id(&self, player: Uuid) -> Result<Option<PlayerRef>, DirectoryError> {
        Ok(self.online.lock().unwrap().get(&player).cloned())
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerRef>, DirectoryError> {
        Ok(self
            .online
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn transfer(&self, player: Uuid, server: &str) -> Result<(), DirectoryError> {
        self.transfers
            .lock()
            .unwrap()
            .push((player, server.to_string()));
        Ok(())
    }

    async fn send_to_player(&self, player: Uuid, text: &str) -> Result<(), DirectoryError> {
        self.messages
            .lock()
            .unwrap()
            .push((player, text.to_string()));
        Ok(())
    }

    async fn broadcast_to_server(&self, server: &str, text: &str) -> Result<(), DirectoryError> {
        self.broadcasts
            .lock()
            .unwrap()
            .push((server.to_string(), text.to_string()));
        Ok(())
    }

    async fn disconnect(&self, player: Uuid, reason: &str) -> Result<(), DirectoryError> {
        self.disconnects
            .lock()
            .unwrap()
            .push((player, reason.to_string()));
        Ok(())
    }
}
