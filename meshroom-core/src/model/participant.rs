use crate::model::identity::Identity;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Presence record of one connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Identity,
    pub display_name: String,
    /// Unix time in milliseconds.
    pub joined_at: u64,
}

impl Participant {
    pub fn new(id: Identity, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            joined_at: now_millis(),
        }
    }
}

/// Full participant set of a room, ordered by join time.
pub type PresenceUpdate = Vec<Participant>;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
