use error::Error;
use events::TimedKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::time::Duration;
use storage::Backend;
use time::Time;

/// One active timed feature: when it runs out, what to put back when it does, and which warning
/// thresholds (in minutes) have already been dealt with since the last activation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimedEntry<V> {
    pub expires_at: Time,
    pub restore: V,
    pub warned: BTreeSet<u64>,
}

impl<V> TimedEntry<V> {
    pub fn new(expires_at: Time, restore: V) -> TimedEntry<V> {
        TimedEntry { expires_at, restore, warned: BTreeSet::new() }
    }

    pub fn is_expired(&self, now: Time) -> bool {
        now >= self.expires_at
    }

    pub fn remaining(&self, now: Time) -> Option<Duration> {
        self.expires_at.remaining_from(now)
    }
}


/// A persisted map of active timed features of one kind. The presence of an entry means the
/// feature is active. Every change is written through to the backend before returning; a failed
/// write is logged and the in-memory state is kept.
pub struct TimedStateStore<K, V> {
    kind: TimedKind,
    entries: BTreeMap<K, TimedEntry<V>>,
    backend: Box<dyn Backend<(K, TimedEntry<V>)>>,
}

impl<K, V> TimedStateStore<K, V>
    where K: Ord + Clone + Debug, V: Clone
{
    pub fn open(kind: TimedKind, backend: Box<dyn Backend<(K, TimedEntry<V>)>>) -> Result<TimedStateStore<K, V>, Error> {
        let entries = backend.load()?.into_iter().collect::<BTreeMap<_, _>>();
        debug!("Loaded {} {} entr{} from {}", entries.len(), kind,
            if entries.len() == 1 { "y" } else { "ies" }, backend.describe());
        Ok(TimedStateStore { kind, entries, backend })
    }

    pub fn kind(&self) -> TimedKind {
        self.kind
    }

    /// Start or renew a feature. Renewal adds `duration` to whatever time is left (an entry which
    /// already ran out renews from `now`), keeps the original `restore` value and clears the
    /// warnings already sent. Returns the new expiry.
    pub fn activate(&mut self, key: K, duration: Duration, restore: V, now: Time) -> Time {
        let expires_at = match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.expires_at = entry.expires_at.max(now).after(duration);
                entry.warned.clear();
                debug!("Renewed {} of {:?} until {:?}", self.kind, key, entry.expires_at);
                entry.expires_at
            },
            None => {
                let entry = TimedEntry::new(now.after(duration), restore);
                let expires_at = entry.expires_at;
                debug!("Activated {} of {:?} until {:?}", self.kind, key, expires_at);
                self.entries.insert(key, entry);
                expires_at
            }
        };
        self.persist();
        expires_at
    }

    /// Remove an entry, returning it so the caller can restore its value.
    pub fn deactivate(&mut self, key: &K) -> Option<TimedEntry<V>> {
        let entry = self.entries.remove(key);
        if entry.is_some() { self.persist(); }
        entry
    }

    /// Put back an entry taken by `deactivate` whose restoration failed.
    pub fn reinstate(&mut self, key: K, entry: TimedEntry<V>) {
        self.entries.insert(key, entry);
        self.persist();
    }

    pub fn get(&self, key: &K) -> Option<&TimedEntry<V>> {
        self.entries.get(key)
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remaining(&self, key: &K, now: Time) -> Option<Duration> {
        self.entries.get(key).and_then(|e| e.remaining(now))
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &TimedEntry<V>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose entries have run out at `now`.
    pub fn expired(&self, now: Time) -> Vec<K> {
        self.entries.iter()
            .filter(|&(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Record warning thresholds as dealt with.
    pub fn mark_warned(&mut self, marks: &[(K, u64)]) {
        if marks.is_empty() { return; }
        for &(ref key, minutes) in marks {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.warned.insert(minutes);
            }
        }
        self.persist();
    }

    /// Drop every entry the predicate rejects, returning what was dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<(K, TimedEntry<V>)>
        where F: FnMut(&K, &TimedEntry<V>) -> bool
    {
        let dropped: Vec<K> = self.entries.iter()
            .filter(|&(k, e)| !keep(k, e))
            .map(|(k, _)| k.clone())
            .collect();
        if dropped.is_empty() { return Vec::new() }

        let removed = dropped.into_iter()
            .filter_map(|k| self.entries.remove(&k).map(|e| (k, e)))
            .collect();
        self.persist();
        removed
    }

    fn persist(&mut self) {
        let rows: Vec<(K, TimedEntry<V>)> = self.entries.iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        if let Err(e) = self.backend.store(&rows) {
            error!("Could not persist {} state to {}: {}", self.kind, self.backend.describe(), e);
        }
    }
}
