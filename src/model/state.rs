use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Saved Teamwork credentials. Either field may be overridden at runtime by
/// the TEAMWORK_KEY / TEAMWORK_URL environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A named local stopwatch. `duration` accumulates finished runs in
/// milliseconds; the current run (if `running`) is measured from `started`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Timer {
    #[serde(default)]
    pub started: Option<DateTime<Local>>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub duration: i64,
}

impl Timer {
    /// Whether this timer was started on the same calendar day as `now`.
    /// Timers from a previous day are stale and never carried over.
    pub fn is_today(&self, now: DateTime<Local>) -> bool {
        self.started
            .map(|s| s.date_naive() == now.date_naive())
            .unwrap_or(false)
    }

    /// Accumulated milliseconds including the current run.
    pub fn elapsed(&self, now: DateTime<Local>) -> i64 {
        let mut total = self.duration;
        if self.running && let Some(s) = self.started {
            total += (now - s).num_milliseconds();
        }
        total
    }
}

/// The single persisted user-state document (timers, favorites, last browsed
/// path, saved credentials, arrival time).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserState {
    #[serde(default)]
    pub teamwork: Credentials,
    #[serde(default)]
    pub timers: IndexMap<String, Timer>,
    /// Favorite name → task id.
    #[serde(default)]
    pub favorites: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived: Option<DateTime<Local>>,
}
