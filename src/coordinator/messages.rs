use actix::Message;

/// A raw payload received on the inbound bus channel, forwarded by the
/// subscriber without interpretation.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RawCommand {
    pub payload: String,
}

/// Fires the auto-start sequence: with no match in progress, clears stale
/// queue entries, opens the queue, and schedules the closing task when the
/// arena host is whitelisted. Sent by the wall-clock tick on a window match.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ArmAutoStart;

/// Re-reads the settings file and replaces the in-memory server whitelist.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReloadWhitelist;

/// Clears the wait queue; sent during process shutdown.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ClearQueue;

/// Reports whether the queue is currently accepting players.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct IsQueueOpen;
