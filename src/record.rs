//! The per-login session record stored in the cache.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::{Duration, OffsetDateTime};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Persisted state for one logical login.
///
/// Serialized with the field names `Key`, `Uuid`, `Data`, `CreatedAt` and `RefreshAt`;
/// timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord<T = serde_json::Value> {
    /// User key the session belongs to.
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Uuid", alias = "SessionId")]
    pub session_id: String,

    /// Caller supplied payload.
    #[serde(rename = "Data")]
    pub data: T,

    #[serde(rename = "CreatedAt", default)]
    pub created_at: i64,

    /// Deadline after which the next access re-stamps the record.
    #[serde(rename = "RefreshAt", default)]
    pub refresh_at: i64,
}

impl<T> SessionRecord<T> {
    /// Create a record stamped at `now`.
    pub fn new(
        key: impl Into<String>,
        session_id: impl Into<String>,
        data: T,
        now: i64,
        max_refresh: Duration,
    ) -> Self {
        let mut record = Self {
            key: key.into(),
            session_id: session_id.into(),
            data,
            created_at: 0,
            refresh_at: 0,
        };
        record.restamp(now, max_refresh);
        record
    }

    /// Whether an access at `now` falls past the refresh deadline.
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.refresh_at == 0 || now > self.refresh_at
    }

    /// Move the sliding window so that it starts at `now`.
    pub fn restamp(&mut self, now: i64, max_refresh: Duration) {
        self.created_at = now;
        self.refresh_at = now.saturating_add(max_refresh.whole_milliseconds() as i64);
    }
}

impl SessionRecord<serde_json::Value> {
    /// Convert the opaque payload into a concrete type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<SessionRecord<T>, serde_json::Error> {
        Ok(SessionRecord {
            data: serde_json::from_value(self.data)?,
            key: self.key,
            session_id: self.session_id,
            created_at: self.created_at,
            refresh_at: self.refresh_at,
        })
    }

    /// Borrowing variant of [`into_typed`](Self::into_typed).
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
