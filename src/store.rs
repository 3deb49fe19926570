use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("expected key '{key}' to be a list but found: {found}")]
    WrongType { key: String, found: String },
}

/// Shared queue/game state plus the outbound side of the command bus.
///
/// Backed by Redis in production; the trait seam exists so command handling
/// can be exercised against an in-memory double.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Inserts the player at the tail of the wait queue. Idempotent: a
    /// player already queued keeps a single entry.
    async fn enqueue(&self, player: Uuid) -> Result<(), StoreError>;
    async fn remove_queued(&self, player: Uuid) -> Result<(), StoreError>;
    async fn is_queued(&self, player: Uuid) -> Result<bool, StoreError>;
    async fn clear_queue(&self) -> Result<(), StoreError>;
    async fn is_in_game(&self, player: Uuid) -> Result<bool, StoreError>;
    async fn remove_from_game(&self, player: Uuid) -> Result<(), StoreError>;
    async fn count_in_game(&self) -> Result<usize, StoreError>;
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;
}

/// Redis-backed store. Every operation clones the connection manager so the
/// connection is scoped to the single call.
pub struct RedisStore {
    conn: ConnectionManager,
    queue_key: String,
    points_key: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, queue_key: String, points_key: String) -> Self {
        Self {
            conn,
            queue_key,
            points_key,
        }
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn enqueue(&self, player: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // The script runs atomically, so racing inserts for the same player
        // collapse to a single entry.
        redis::Script::new(
            "if redis.call('LPOS', KEYS[1], ARGV[1]) then return 0 end \
             return redis.call('RPUSH', KEYS[1], ARGV[1])",
        )
        .key(&self.queue_key)
        .arg(player.to_string())
        .invoke_async::<_, i64>(&mut conn)
        .await?;
        Ok(())
    }

    async fn remove_queued(&self, player: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // count 0 removes every occurrence, so duplicates cannot linger.
        conn.lrem::<_, _, ()>(&self.queue_key, 0, player.to_string())
            .await?;
        Ok(())
    }

    async fn is_queued(&self, player: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let queued: Vec<String> = conn.lrange(&self.queue_key, 0, -1).await?;
        Ok(queued.iter().any(|id| id == &player.to_string()))
    }

    async fn clear_queue(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key_type: String = redis::cmd("TYPE")
            .arg(&self.queue_key)
            .query_async(&mut conn)
            .await?;

        match clear_action(&key_type) {
            ClearAction::Skip => Ok(()),
            ClearAction::Delete => {
                conn.del::<_, ()>(&self.queue_key).await?;
                info!("Cleared wait queue '{}'", self.queue_key);
                Ok(())
            }
            ClearAction::Refuse => {
                error!(
                    "Refusing to clear '{}': expected a list but found type '{}'",
                    self.queue_key, key_type
                );
                Err(StoreError::WrongType {
                    key: self.queue_key.clone(),
                    found: key_type,
                })
            }
        }
    }

    async fn is_in_game(&self, player: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.hexists(&self.points_key, player.to_string()).await?)
    }

    async fn remove_from_game(&self, player: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(&self.points_key, player.to_string())
            .await?;
        Ok(())
    }

    async fn count_in_game(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.hlen(&self.points_key).await?)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, i32>(channel, payload).await?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ClearAction {
    /// Key absent: the queue is already empty.
    Skip,
    Delete,
    /// Key holds some other type; deleting would destroy foreign data.
    Refuse,
}

fn clear_action(key_type: &str) -> ClearAction {
    match key_type {
        "none" => ClearAction::Skip,
        "list" => ClearAction::Delete,
        _ => ClearAction::Refuse,
    }
}
