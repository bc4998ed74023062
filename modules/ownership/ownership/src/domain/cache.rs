//! In-process cache of ownership decisions.
//!
//! Entries are grouped per resource so that any mutation of a resource can drop
//! every cached answer about it at once. Each resource also carries a
//! generation, bumped on invalidation: an answer computed from a read that
//! started before the bump is never stored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ownership_security::{OwnerRef, ResourceRef};

use crate::config::CacheConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Question {
    HasOwner(OwnerRef),
    Permission(OwnerRef, String),
}

/// Generation of a resource's cached decisions, taken before reading storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug, Clone, Copy)]
struct Entry {
    answer: bool,
    expires_at: Instant,
}

/// Slots outlive invalidation so their generation keeps counting.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    answers: HashMap<Question, Entry>,
}

#[derive(Debug)]
pub struct DecisionCache {
    enabled: bool,
    ttl: Duration,
    prefix: String,
    entries: DashMap<String, Slot>,
}

impl DecisionCache {
    #[must_use]
    pub fn new(cfg: &CacheConfig) -> Self {
        Self {
            enabled: cfg.enabled && cfg.ttl > 0,
            ttl: cfg.ttl_duration(),
            prefix: cfg.prefix.clone(),
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
            prefix: String::new(),
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn key(&self, resource: &ResourceRef) -> String {
        format!("{}{resource}", self.prefix)
    }

    #[must_use]
    pub fn get(&self, resource: &ResourceRef, question: &Question) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        let key = self.key(resource);
        let mut slot = self.entries.get_mut(&key)?;
        let entry = slot.answers.get(question).copied()?;
        if entry.expires_at > Instant::now() {
            tracing::trace!(cache_key = %key, ?question, "ownership decision cache hit");
            Some(entry.answer)
        } else {
            slot.answers.remove(question);
            None
        }
    }

    /// Current generation of `resource`; pass it to [`DecisionCache::put`].
    #[must_use]
    pub fn generation(&self, resource: &ResourceRef) -> Generation {
        if !self.enabled {
            return Generation(0);
        }
        Generation(
            self.entries
                .get(&self.key(resource))
                .map_or(0, |slot| slot.generation),
        )
    }

    /// Store `answer` unless `resource` was invalidated since `seen` was taken.
    pub fn put(&self, resource: &ResourceRef, seen: Generation, question: Question, answer: bool) {
        if !self.enabled {
            return;
        }
        let Some(expires_at) = Instant::now().checked_add(self.ttl) else {
            return;
        };
        let key = self.key(resource);
        let mut slot = self.entries.entry(key).or_default();
        if slot.generation != seen.0 {
            tracing::trace!(resource = %resource, ?question, "decision outdated by a mutation, not cached");
            return;
        }
        slot.answers.insert(question, Entry { answer, expires_at });
    }

    /// Forget every decision about `resource`.
    pub fn invalidate(&self, resource: &ResourceRef) {
        if !self.enabled {
            return;
        }
        let mut slot = self.entries.entry(self.key(resource)).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.answers.clear();
    }
}
