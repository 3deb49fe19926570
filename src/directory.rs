use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::env::DirectorySettings;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directory returned unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
}

/// A live, addressable player session as the routing proxy knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRef {
    pub id: Uuid,
    pub name: String,
}

/// Resolves player and backend-server names to live connections and performs
/// the actual network hand-offs. Implemented by the routing proxy; this
/// crate only consumes it.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn server_exists(&self, server: &str) -> Result<bool, DirectoryError>;
    async fn list_servers(&self) -> Result<Vec<String>, DirectoryError>;
    async fn players_on(&self, server: &str) -> Result<Vec<PlayerRef>, DirectoryError>;
    async fn resolve_id(&self, player: Uuid) -> Result<Option<PlayerRef>, DirectoryError>;
    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerRef>, DirectoryError>;
    /// Fire-and-forget hand-off of a connected player to a backend server.
    async fn transfer(&self, player: Uuid, server: &str) -> Result<(), DirectoryError>;
    async fn send_to_player(&self, player: Uuid, text: &str) -> Result<(), DirectoryError>;
    async fn broadcast_to_server(&self, server: &str, text: &str) -> Result<(), DirectoryError>;
    async fn disconnect(&self, player: Uuid, reason: &str) -> Result<(), DirectoryError>;
}

#[derive(Serialize)]
struct TransferRequest<'a> {
    server: &'a str,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct DisconnectRequest<'a> {
    reason: &'a str,
}

/// Directory client over the proxy's admin HTTP API. A GET 404 means the
/// player or server is not currently known, which callers treat as a
/// skippable target rather than an error.
pub struct HttpSessionDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionDirectory {
    pub fn new(settings: &DirectorySettings) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_optional<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Option<T>, DirectoryError> {
        let resp = self.client.get(self.url(path)).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            status => Err(DirectoryError::UnexpectedStatus(status)),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), DirectoryError> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(DirectoryError::UnexpectedStatus(resp.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionDirectory for HttpSessionDirectory {
    async fn server_exists(&self, server: &str) -> Result<bool, DirectoryError> {
        let found: Option<serde_json::Value> =
            self.get_optional(&format!("/servers/{}", server)).await?;
        Ok(found.is_some())
    }

    async fn list_servers(&self) -> Result<Vec<String>, DirectoryError> {
        let resp = self.client.get(self.url("/servers")).send().await?;
        if !resp.status().is_success() {
            return Err(DirectoryError::UnexpectedStatus(resp.status()));
        }
        Ok(resp.json().await?)
    }

    async fn players_on(&self, server: &str) -> Result<Vec<PlayerRef>, DirectoryError> {
        let players: Option<Vec<PlayerRef>> = self
            .get_optional(&format!("/servers/{}/players", server))
            .await?;
        Ok(players.unwrap_or_default())
    }

    async fn resolve_id(&self, player: Uuid) -> Result<Option<PlayerRef>, DirectoryError> {
        self.get_optional(&format!("/players/{}", player)).await
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerRef>, DirectoryError> {
        self.get_optional(&format!("/players/by-name/{}", name))
            .await
    }

    async fn transfer(&self, player: Uuid, server: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("/players/{}/transfer", player),
            &TransferRequest { server },
        )
        .await
    }

    async fn send_to_player(&self, player: Uuid, text: &str) -> Result<(), DirectoryError> {
        self.post(&format!("/players/{}/message", player), &TextRequest { text })
            .await
    }

    async fn broadcast_to_server(&self, server: &str, text: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("/servers/{}/broadcast", server),
            &TextRequest { text },
        )
        .await
    }

    async fn disconnect(&self, player: Uuid, reason: &str) -> Result<(), DirectoryError> {
        self.post(
            &format!("/players/{}/disconnect", player),
            &DisconnectRequest { reason },
        )
        .await
    }
}
