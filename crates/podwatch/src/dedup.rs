//! Deduplication of restart notifications.
//!
//! Remembers, per `namespace/name`, the latest pod start time a notification
//! has been dispatched for. A restart is new only if its start time is
//! strictly later than the remembered one.
//!
//! Entries age by poll cycle: every time a key is observed its cycle stamp is
//! refreshed, and keys not observed for `max_idle_cycles` cycles are evicted.
//! A capacity bound evicts the least recently observed keys first, but
//! never a key observed in the current cycle.
//!
//! The state is owned by the detector loop and is never shared.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

/// Default number of idle poll cycles before an entry is evicted.
pub const DEFAULT_MAX_IDLE_CYCLES: u64 = 120;

/// Default maximum number of tracked keys.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Entry {
    notified_start: DateTime<Utc>,
    last_seen_cycle: u64,
}

/// Latest notified start time per pod key.
#[derive(Debug)]
pub struct DedupState {
    entries: HashMap<String, Entry>,
    cycle: u64,
    max_idle_cycles: u64,
    capacity: usize,
}

impl Default for DedupState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE_CYCLES, DEFAULT_CAPACITY)
    }
}

impl DedupState {
    pub fn new(max_idle_cycles: u64, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            cycle: 0,
            max_idle_cycles,
            capacity: capacity.max(1),
        }
    }

    /// Start a new poll cycle. Call once per successful listing.
    pub fn begin_cycle(&mut self) {
        self.cycle += 1;
    }

    /// Current poll cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Record an observation of `key` restarted at `start_time`.
    ///
    /// Returns `true` when this is a new restart (no entry, or a strictly
    /// later start time); the entry is updated before returning so the caller
    /// can dispatch without a race.
    pub fn observe(&mut self, key: &str, start_time: DateTime<Utc>) -> bool {
        let cycle = self.cycle;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_seen_cycle = cycle;
            if start_time > entry.notified_start {
                entry.notified_start = start_time;
                return true;
            }
            return false;
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                notified_start: start_time,
                last_seen_cycle: cycle,
            },
        );
        true
    }

    /// Latest notified start time for `key`.
    pub fn notified_start(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|e| e.notified_start)
    }

    /// Drop idle entries, then enforce capacity. Returns how many were evicted.
    ///
    /// Entries observed in the current cycle are never evicted: forgetting a
    /// live key would re-notify its unchanged restart on the next poll. When
    /// the live set alone exceeds the capacity, the bound is exceeded.
    pub fn evict(&mut self) -> usize {
        let before = self.entries.len();
        let cycle = self.cycle;
        let max_idle = self.max_idle_cycles;
        self.entries
            .retain(|_, e| cycle.saturating_sub(e.last_seen_cycle) <= max_idle);

        if self.entries.len() > self.capacity {
            let mut stale: Vec<(String, u64)> = self
                .entries
                .iter()
                .filter(|(_, e)| e.last_seen_cycle < cycle)
                .map(|(k, e)| (k.clone(), e.last_seen_cycle))
                .collect();
            stale.sort_by_key(|(_, seen)| *seen);
            let excess = self.entries.len() - self.capacity;
            for (key, _) in stale.into_iter().take(excess) {
                self.entries.remove(&key);
            }

            if self.entries.len() > self.capacity {
                warn!(
                    tracked = self.entries.len(),
                    capacity = self.capacity,
                    "Restarted pods seen this cycle exceed dedup capacity"
                );
            }
        }

        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
