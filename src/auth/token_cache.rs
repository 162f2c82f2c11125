//! Expiring cache of validated bearer tokens

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::clock::Clock;
use super::validator::UserIdentity;

struct CachedIdentity {
    identity: UserIdentity,
    expires_at: DateTime<Utc>,
}

/// Remembers successful validations for a fixed time-to-live
///
/// Tokens are keyed by their SHA-256 digest.
pub struct TokenCache {
    entries: Mutex<HashMap<String, CachedIdentity>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Cached identity for `token`, dropping it if expired
    pub fn get(&self, token: &str) -> Option<UserIdentity> {
        let key = token_key(token);
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        match entries.get(&key) {
            Some(cached) if now < cached.expires_at => Some(cached.identity.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Remember `identity` for `token`, dropping expired entries of other tokens
    pub fn insert(&self, token: &str, identity: UserIdentity) {
        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!("Dropped {} expired tokens", purged);
        }

        let expires_at = self.clock.now() + self.ttl;
        self.entries.lock().insert(
            token_key(token),
            CachedIdentity {
                identity,
                expires_at,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, cached| now < cached.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn user(login: &str) -> UserIdentity {
        UserIdentity {
            login: login.to_string(),
            id: 1,
            name: None,
        }
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::new(Duration::seconds(300), clock.clone());

        cache.insert("token-a", user("ada"));
        assert_eq!(cache.get("token-a").map(|u| u.login), Some("ada".to_string()));

        clock.advance(Duration::seconds(299));
        assert!(cache.get("token-a").is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get("token-a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_token() {
        let cache = TokenCache::new(Duration::seconds(300), Arc::new(ManualClock::new(Utc::now())));
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_insert_drops_expired_entries_of_other_tokens() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::new(Duration::seconds(10), clock.clone());

        cache.insert("first", user("first"));
        cache.insert("second", user("second"));
        clock.advance(Duration::seconds(11));
        cache.insert("third", user("third"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_purge_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::new(Duration::seconds(10), clock.clone());

        cache.insert("old", user("old"));
        clock.advance(Duration::seconds(5));
        cache.insert("new", user("new"));
        clock.advance(Duration::seconds(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }
}
