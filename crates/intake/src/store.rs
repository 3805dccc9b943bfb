//! In-memory session store with idle expiry and a capacity bound, plus the
//! per-session turn locks the dispatcher uses.

use async_trait::async_trait;
use nyay_core::session::{SessionKey, SessionState, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::debug;

struct Slot {
    state: SessionState,
    last_seen: Instant,
}

/// Sessions kept in a `HashMap` behind a `tokio::sync::RwLock`.
///
/// Entries not touched for `ttl` count as absent and are dropped lazily (or
/// by [`purge_expired`](Self::purge_expired)). Inserting a new key into a
/// full store evicts the least recently seen entry.
pub struct InMemorySessionStore {
    slots: RwLock<HashMap<SessionKey, Slot>>,
    ttl: Duration,
    capacity: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &nyay_config::IntakeConfig) -> Self {
        Self::new(Duration::from_secs(config.session_ttl_secs), config.max_sessions)
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        now.duration_since(slot.last_seen) >= self.ttl
    }

    /// Drop every expired entry, returning how many went.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| !self.is_expired(slot, now));
        let purged = before - slots.len();
        if purged > 0 {
            debug!(purged, remaining = slots.len(), "Purged expired sessions");
        }
        purged
    }

    /// Make room for one more key.
    fn make_room(&self, slots: &mut HashMap<SessionKey, Slot>, now: Instant) {
        if slots.len() < self.capacity {
            return;
        }
        slots.retain(|_, slot| !self.is_expired(slot, now));
        if slots.len() < self.capacity {
            return;
        }
        if let Some(oldest) = slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_seen)
            .map(|(key, _)| key.clone())
        {
            debug!(session = %oldest, "Session store full, evicting least recently seen");
            slots.remove(&oldest);
        }
    }

    async fn write_state(&self, key: &SessionKey, state: SessionState) {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        if !slots.contains_key(key) {
            self.make_room(&mut slots, now);
        }
        slots.insert(
            key.clone(),
            Slot {
                state,
                last_seen: now,
            },
        );
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::from_config(&nyay_config::IntakeConfig::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create(&self, key: &SessionKey) -> SessionState {
        let now = Instant::now();
        let mut slots = self.slots.write().await;

        match slots.get_mut(key) {
            Some(slot) if !self.is_expired(slot, now) => {
                slot.last_seen = now;
                return slot.state.clone();
            }
            Some(slot) => {
                debug!(session = %key, "Session expired, starting fresh");
                slot.state = SessionState::default();
                slot.last_seen = now;
                return SessionState::default();
            }
            None => {}
        }

        self.make_room(&mut slots, now);
        slots.insert(
            key.clone(),
            Slot {
                state: SessionState::default(),
                last_seen: now,
            },
        );
        SessionState::default()
    }

    async fn reset(&self, key: &SessionKey) {
        self.write_state(key, SessionState::default()).await;
    }

    async fn put(&self, key: &SessionKey, state: SessionState) {
        self.write_state(key, state).await;
    }

    async fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| !self.is_expired(slot, now))
            .count()
    }
}

/// One async mutex per session key, so that turns for the same session run
/// one at a time while different sessions proceed in parallel.
#[derive(Default)]
pub struct TurnLocks {
    locks: std::sync::Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`. Released when the guard drops.
    pub async fn lock(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Locks nobody holds or waits on are only referenced by the map.
            locks.retain(|k, lock| k == key || Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys with a lock currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
