//! Session identity
//!
//! Produces and caches the session identifier addressing one customer
//! conversation. Pure local state derivation; there are no error conditions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use rand::{distributions::Alphanumeric, Rng};
use time::OffsetDateTime;

/// Identity key shared by every unauthenticated visitor on one browser
pub const GUEST_IDENTITY: &str = "guest";

/// Who the customer is, as far as session addressing cares
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CustomerIdentity {
    /// Unauthenticated visitor
    Guest,
    /// Authenticated customer, keyed by email or user id
    Known(String),
}

impl CustomerIdentity {
    pub fn key(&self) -> &str {
        match self {
            CustomerIdentity::Guest => GUEST_IDENTITY,
            CustomerIdentity::Known(id) => id,
        }
    }
}

/// Durable client-side cache mapping identity keys to session identifiers
///
/// Durability across reloads is what lets a returning customer resume the
/// same transcript.
pub trait SessionCache: Send + Sync {
    fn get(&self, identity_key: &str) -> Option<String>;
    fn put(&self, identity_key: &str, session_id: &str);
}

/// Return the cached session id for this identity, or mint and cache a new one
///
/// Identifiers are stable per identity and cannot collide across identities:
/// the identity key is embedded next to a millisecond timestamp and a random
/// suffix.
pub fn resolve_session_id(cache: &dyn SessionCache, identity: &CustomerIdentity) -> String {
    let key = identity.key();
    if let Some(existing) = cache.get(key) {
        return existing;
    }

    let session_id = mint_session_id(key);
    cache.put(key, &session_id);
    session_id
}

fn mint_session_id(identity_key: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("session-{identity_key}-{millis}-{suffix}")
}

// =============================================================================
// Cache implementations
// =============================================================================

/// Process-local cache, for tests and short-lived embedders
#[derive(Default)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, identity_key: &str) -> Option<String> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(identity_key).cloned()
    }

    fn put(&self, identity_key: &str, session_id: &str) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(identity_key.to_string(), session_id.to_string());
    }
}

/// File-backed cache: a JSON object of identity key → session id
///
/// The widget analog of browser local storage. I/O failures are logged and
/// ignored; the worst case is a fresh session id on the next visit.
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_entries(&self) -> HashMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, identity_key: &str) -> Option<String> {
        self.read_entries().get(identity_key).cloned()
    }

    fn put(&self, identity_key: &str, session_id: &str) {
        let mut entries = self.read_entries();
        entries.insert(identity_key.to_string(), session_id.to_string());

        match serde_json::to_string(&entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!(error = %e, path = ?self.path, "Failed to persist session cache");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode session cache");
            }
        }
    }
}
