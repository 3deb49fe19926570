use chrono::{DateTime, Local, Timelike};

/// True exactly at the recurring auto-start instant: second 0 of minute 0 of
/// every third hour.
pub fn window_matches(now: &DateTime<Local>) -> bool {
    now.second() == 0 && now.minute() == 0 && now.hour() % 3 == 0
}

/// Suppresses a second fire within the same matched wall-clock second. The
/// tick runs once per second, but a tick delayed past the window must not
/// fire retroactively, and two ticks landing inside one second must not fire
/// twice.
#[derive(Debug, Default)]
pub struct RefireGuard {
    last_fired_epoch: Option<i64>,
}

impl RefireGuard {
    /// Records the fire for `now` and returns whether it is allowed.
    pub fn try_fire(&mut self, now: &DateTime<Local>) -> bool {
        let epoch = now.timestamp();
        if self.last_fired_epoch == Some(epoch) {
            return false;
        }
        self.last_fired_epoch = Some(epoch);
        true
    }
}
