use thiserror::Error;
use uuid::Uuid;

/// Outbound payload telling the backend servers the match is starting.
pub const START: &str = "start";

/// Builds the outbound queue confirmation for a player.
pub fn confirm_queue(player: Uuid) -> String {
    format!("confirmQueue:{}", player)
}

// Notice texts rendered by the proxy's chat layer; the coordinator only
// decides who receives them.
pub const QUEUE_CLOSED_NOTICE: &str = "The queue is not currently open";
pub const JOIN_INVITATION: &str = "An arena event is starting now. Run /queue to join.";
pub const GAME_CANCELED_NOTICE: &str = "Not enough players to start.";
pub const TIMEOUT_REASON: &str = "Timed out";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message type: {0}")]
    UnknownKind(String),
    #[error("malformed {kind} message: expected {expected} fields, got {got}")]
    Malformed {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("malformed {1} message: invalid player id: {0}")]
    InvalidPlayerId(#[source] uuid::Error, &'static str),
}

/// A single inbound bus command, parsed from a colon-delimited payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `teleportPlayersTo:<server>:<[p1,p2,...]>`
    RouteGroup {
        server: String,
        players: Vec<String>,
    },
    /// `teleportTo:<server>:<player>`
    RouteOne { server: String, player: String },
    /// `queue:<uuid>`
    Enqueue { player: Uuid },
    /// `forceStart`
    ForceStart,
    /// `gameCanceled[:<uuid>]`: the trailing id is a legacy field and is
    /// ignored, valid or not.
    CancelGame { player: Option<Uuid> },
    /// `gameCanceledEarly`
    CancelGameEarly,
    /// `timeout:<uuid>`
    Timeout { player: Uuid },
    /// `playerDisconnect:<uuid>`, relayed by the proxy on session loss.
    Disconnected { player: Uuid },
    /// `reloadServers`
    ReloadServers,
}

impl Command {
    /// Parses a raw payload. The kind is the substring before the first `:`,
    /// or the whole payload when no separator is present.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let parts: Vec<&str> = payload.split(':').collect();
        let kind = parts[0];

        match kind {
            "teleportPlayersTo" => {
                require_fields("teleportPlayersTo", &parts, 3)?;
                let players = parts[2]
                    .split(',')
                    .map(|name| name.replace('[', "").replace(']', ""))
                    .filter(|name| !name.is_empty())
                    .collect();
                Ok(Command::RouteGroup {
                    server: parts[1].to_string(),
                    players,
                })
            }
            "teleportTo" => {
                require_fields("teleportTo", &parts, 3)?;
                Ok(Command::RouteOne {
                    server: parts[1].to_string(),
                    player: parts[2].to_string(),
                })
            }
            "queue" => {
                require_fields("queue", &parts, 2)?;
                Ok(Command::Enqueue {
                    player: parse_player(parts[1], "queue")?,
                })
            }
            "forceStart" => Ok(Command::ForceStart),
            "gameCanceled" => Ok(Command::CancelGame {
                // Legacy trailing field; a bad id must not suppress the cancel.
                player: parts.get(1).and_then(|raw| Uuid::parse_str(raw).ok()),
            }),
            "gameCanceledEarly" => Ok(Command::CancelGameEarly),
            "timeout" => {
                require_fields("timeout", &parts, 2)?;
                Ok(Command::Timeout {
                    player: parse_player(parts[1], "timeout")?,
                })
            }
            "playerDisconnect" => {
                require_fields("playerDisconnect", &parts, 2)?;
                Ok(Command::Disconnected {
                    player: parse_player(parts[1], "playerDisconnect")?,
                })
            }
            "reloadServers" => Ok(Command::ReloadServers),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

fn require_fields(
    kind: &'static str,
    parts: &[&str],
    expected: usize,
) -> Result<(), ProtocolError> {
    if parts.len() < expected {
        return Err(ProtocolError::Malformed {
            kind,
            expected,
            got: parts.len(),
        });
    }
    Ok(())
}

fn parse_player(raw: &str, kind: &'static str) -> Result<Uuid, ProtocolError> {
    Uuid::parse_str(raw).map_err(|e| ProtocolError::InvalidPlayerId(e, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_group_strips_brackets() {
        let cmd = Command::parse("teleportPlayersTo:arena:[Steve,Alex]").unwrap();
        assert_eq!(
            cmd,
            Command::RouteGroup {
                server: "arena".to_string(),
                players: vec!["Steve".to_string(), "Alex".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_route_one() {
        let cmd = Command::parse("teleportTo:lobby:Steve").unwrap();
        assert_eq!(
            cmd,
            Command::RouteOne {
                server: "lobby".to_string(),
                player: "Steve".to_string(),
            }
        );
    }

    #[test]
    fn test_route_one_missing_player_is_malformed() {
        let err = Command::parse("teleportTo:lobby").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Malformed {
                kind: "teleportTo",
                expected: 3,
                got: 2,
            }
        ));
    }

    #[test]
    fn test_parse_enqueue() {
        let id = Uuid::new_v4();
        let cmd = Command::parse(&format!("queue:{}", id)).unwrap();
        assert_eq!(cmd, Command::Enqueue { player: id });
    }

    #[test]
    fn test_enqueue_rejects_bad_uuid() {
        let err = Command::parse("queue:not-a-uuid").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPlayerId(_, "queue")));
    }

    #[test]
    fn test_parse_bare_kinds() {
        assert_eq!(Command::parse("forceStart").unwrap(), Command::ForceStart);
        assert_eq!(
            Command::parse("gameCanceledEarly").unwrap(),
            Command::CancelGameEarly
        );
        assert_eq!(
            Command::parse("reloadServers").unwrap(),
            Command::ReloadServers
        );
    }

    #[test]
    fn test_game_canceled_player_id_is_optional() {
        assert_eq!(
            Command::parse("gameCanceled").unwrap(),
            Command::CancelGame { player: None }
        );
        let id = Uuid::new_v4();
        assert_eq!(
            Command::parse(&format!("gameCanceled:{}", id)).unwrap(),
            Command::CancelGame { player: Some(id) }
        );
    }

    #[test]
    fn test_game_canceled_survives_a_bad_legacy_id() {
        assert_eq!(
            Command::parse("gameCanceled:not-a-uuid").unwrap(),
            Command::CancelGame { player: None }
        );
    }

    #[test]
    fn test_parse_timeout_and_disconnect() {
        let id = Uuid::new_v4();
        assert_eq!(
            Command::parse(&format!("timeout:{}", id)).unwrap(),
            Command::Timeout { player: id }
        );
        assert_eq!(
            Command::parse(&format!("playerDisconnect:{}", id)).unwrap(),
            Command::Disconnected { player: id }
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = Command::parse("somethingElse:1:2").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownKind(k) if k == "somethingElse"));
    }

    #[test]
    fn test_confirm_queue_payload() {
        let id = Uuid::new_v4();
        assert_eq!(confirm_queue(id), format!("confirmQueue:{}", id));
    }
}
