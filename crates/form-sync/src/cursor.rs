use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted resumption point for one subscription's change feed.
///
/// The cursor token is opaque to us; the external API owns its meaning. It
/// is persisted only after a batch's effects are durably applied, so a
/// crash replays an already-idempotent batch instead of losing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub subscription_id: String,
    pub last_cursor: Option<String>,
    pub last_polled_at: DateTime<Utc>,
}

impl CursorState {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            last_cursor: None,
            last_polled_at: Utc::now(),
        }
    }

    pub fn advance(&mut self, cursor: Option<String>, now: DateTime<Utc>) {
        if cursor.is_some() {
            self.last_cursor = cursor;
        }
        self.last_polled_at = now;
    }
}
