use super::types::{Session, Turn};
use crate::error::SessionError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Session persistence contract.
///
/// Implementations must allow distinct users to proceed fully in parallel
/// while serializing operations on any single user's session.
pub trait SessionStore: Send + Sync {
    /// Return a snapshot of the user's session, creating an empty one on
    /// first contact. Never fails.
    fn get_or_create(&self, user_id: &str) -> Session;

    /// Append a turn to the user's history and bump `last_activity`.
    /// `NotFound` only occurs if the session vanished out from under the
    /// caller; normal flow is preceded by [`Self::get_or_create`].
    fn append(&self, user_id: &str, turn: Turn) -> Result<(), SessionError>;

    /// The most recent `limit` turns in chronological order (`0` = all).
    /// Empty if the user has no session.
    fn history(&self, user_id: &str, limit: usize) -> Vec<Turn>;

    /// Remove every session with `now - last_activity > ttl`, returning the
    /// number removed. A session exactly `ttl` old survives.
    fn evict_older_than(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, SessionError>;

    /// Drop one user's session. Returns whether anything was removed.
    fn remove(&self, user_id: &str) -> bool;

    /// Drop all sessions, returning how many there were.
    fn clear(&self) -> usize;

    /// Number of live sessions (diagnostics).
    fn size(&self) -> usize;
}

/// In-memory store with keyed locking: the outer map is shared-read for the
/// request path, and each session carries its own mutex so two concurrent
/// messages from the same user cannot interleave appends.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> Option<Arc<Mutex<Session>>> {
        let map = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.get(user_id).cloned()
    }

    fn lock_session(slot: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get_or_create(&self, user_id: &str) -> Session {
        if let Some(slot) = self.slot(user_id) {
            return Self::lock_session(&slot).clone();
        }

        let mut map = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another request may have created the session between the read
        // above and taking the write lock.
        let slot = map
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(user_id, "creating session");
                Arc::new(Mutex::new(Session::new(user_id)))
            })
            .clone();
        drop(map);

        Self::lock_session(&slot).clone()
    }

    fn append(&self, user_id: &str, turn: Turn) -> Result<(), SessionError> {
        let slot = self
            .slot(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.to_string()))?;
        let mut session = Self::lock_session(&slot);
        session.last_activity = turn.timestamp;
        session.history.push(turn);
        Ok(())
    }

    fn history(&self, user_id: &str, limit: usize) -> Vec<Turn> {
        let Some(slot) = self.slot(user_id) else {
            return Vec::new();
        };
        let session = Self::lock_session(&slot);
        let skip = if limit == 0 {
            0
        } else {
            session.history.len().saturating_sub(limit)
        };
        session.history[skip..].to_vec()
    }

    fn evict_older_than(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, SessionError> {
        // Holding the write lock for the whole pass keeps the scan
        // snapshot-consistent with respect to creates and appends.
        let mut map = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, slot| {
            let session = Self::lock_session(slot);
            now - session.last_activity <= ttl
        });
        let removed = before - map.len();
        if removed > 0 {
            tracing::info!(removed, remaining = map.len(), "evicted idle sessions");
        }
        Ok(removed)
    }

    fn remove(&self, user_id: &str) -> bool {
        let mut map = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = map.remove(user_id).is_some();
        if removed {
            tracing::info!(user_id, "session removed");
        }
        removed
    }

    fn clear(&self) -> usize {
        let mut map = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let count = map.len();
        map.clear();
        if count > 0 {
            tracing::info!(count, "all sessions removed");
        }
        count
    }

    fn size(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
