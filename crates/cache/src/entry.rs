//! The unit stored in both cache tiers

use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the file state it was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Fingerprint of the source file when the payload was stored
    pub fingerprint: Fingerprint,
    /// When the entry was written; drives age-based expiry
    pub created_at: DateTime<Utc>,
    /// Last successful read
    pub accessed_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Create an entry stamped with `now` as both creation and access time
    #[must_use]
    pub fn new(data: T, fingerprint: Fingerprint, now: DateTime<Utc>) -> Self {
        Self {
            data,
            fingerprint,
            created_at: now,
            accessed_at: now,
        }
    }

    /// Whether the entry is at least `max_age` old at `now`
    #[must_use]
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        older_than(self.created_at, max_age, now)
    }

    /// Record a successful read
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.accessed_at = now;
    }
}

/// Whether `timestamp` lies `max_age` or more before `now`
pub(crate) fn older_than(timestamp: DateTime<Utc>, max_age: Duration, now: DateTime<Utc>) -> bool {
    // A max age too large for chrono can never be reached
    chrono::Duration::from_std(max_age).is_ok_and(|max_age| now - timestamp >= max_age)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(created: DateTime<Utc>) -> CacheEntry<u32> {
        CacheEntry::new(
            7,
            Fingerprint {
                path: "a".to_string(),
                mtime: created,
                size: 1,
                content_hash: String::new(),
            },
            created,
        )
    }

    #[test]
    fn new_entry_has_equal_timestamps() {
        let entry = entry_at(Utc::now());
        assert_eq!(entry.created_at, entry.accessed_at);
    }

    #[test]
    fn expiry_boundary() {
        let created = Utc::now();
        let entry = entry_at(created);
        let max_age = Duration::from_secs(60);

        assert!(!entry.is_expired(max_age, created + chrono::Duration::seconds(59)));
        assert!(entry.is_expired(max_age, created + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(max_age, created + chrono::Duration::seconds(61)));
    }

    #[test]
    fn huge_max_age_never_expires() {
        let entry = entry_at(Utc::now());
        assert!(!entry.is_expired(Duration::MAX, Utc::now()));
    }

    #[test]
    fn touch_only_moves_access_time() {
        let created = Utc::now();
        let mut entry = entry_at(created);
        let later = created + chrono::Duration::seconds(5);
        entry.touch(later);
        assert_eq!(entry.created_at, created);
        assert_eq!(entry.accessed_at, later);
    }
}
