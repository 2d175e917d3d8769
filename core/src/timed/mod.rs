//! Temporary plot state: lifetime timers, vertical expansions and flag rentals, each kept in its
//! own persisted store and swept by the same scheduler.

mod scheduler;
mod store;

pub use self::scheduler::{ExpiryHandler, SweepReport, TimedStateScheduler};
pub use self::store::{TimedEntry, TimedStateStore};

use env::{FLAGS_FILE, LIFETIME_FILE, VERTICAL_FILE};
use error::Error;
use events::TimedKind;
use primitives::PlotId;
use std::fmt;
use storage::{Encoding, Storage};

/// A rented flag on a plot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlagKey {
    pub plot: PlotId,
    pub flag: String,
}

impl FlagKey {
    pub fn new(plot: &str, flag: &str) -> FlagKey {
        FlagKey { plot: plot.to_owned(), flag: flag.to_owned() }
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.plot, self.flag)
    }
}

/// The vertical range a plot had before its expansion and the height its level is centered on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalRestore {
    pub min_y: i32,
    pub max_y: i32,
    pub anchor_y: i32,
}

pub type LifetimeStore = TimedStateStore<PlotId, ()>;
pub type VerticalStore = TimedStateStore<PlotId, VerticalRestore>;
/// Restores the flag's previous value, `None` meaning it was unset.
pub type FlagStore = TimedStateStore<FlagKey, Option<String>>;

/// The three timed stores of one service.
pub struct Timers {
    pub lifetime: LifetimeStore,
    pub vertical: VerticalStore,
    pub flags: FlagStore,
}

impl Timers {
    pub fn open(storage: &Storage) -> Result<Timers, Error> {
        Ok(Timers {
            lifetime: TimedStateStore::open(TimedKind::Lifetime, storage.table(LIFETIME_FILE, Encoding::Json))?,
            vertical: TimedStateStore::open(TimedKind::VerticalExpansion, storage.table(VERTICAL_FILE, Encoding::Json))?,
            flags: TimedStateStore::open(TimedKind::FlagRental, storage.table(FLAGS_FILE, Encoding::Json))?,
        })
    }

    /// Drop every entry of a plot without restoring anything. Returns how many were dropped.
    pub fn forget_plot(&mut self, plot: &str) -> usize {
        let mut dropped = 0;
        dropped += self.lifetime.deactivate(&plot.to_owned()).map_or(0, |_| 1);
        dropped += self.vertical.deactivate(&plot.to_owned()).map_or(0, |_| 1);
        dropped += self.flags.retain(|k, _| k.plot != plot).len();
        dropped
    }

    /// Rented flags of a plot.
    pub fn flags_of(&self, plot: &str) -> Vec<FlagKey> {
        self.flags.keys().into_iter().filter(|k| k.plot == plot).collect()
    }

    pub fn len(&self) -> usize {
        self.lifetime.len() + self.vertical.len() + self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storage::test_dir;
    use time::Time;

    #[test]
    fn forget_plot_touches_only_that_plot() {
        let mut timers = Timers::open(&Storage::Volatile).unwrap();
        let now = Time::from_seconds(0);
        let d = Duration::from_secs(600);
        timers.lifetime.activate("alice_1".into(), d, (), now);
        timers.lifetime.activate("bob_1".into(), d, (), now);
        timers.vertical.activate("alice_1".into(), d, VerticalRestore { min_y: 57, max_y: 71, anchor_y: 64 }, now);
        timers.flags.activate(FlagKey::new("alice_1", "pvp"), d, None, now);
        timers.flags.activate(FlagKey::new("alice_1", "fly"), d, Some("deny".into()), now);
        timers.flags.activate(FlagKey::new("bob_1", "pvp"), d, None, now);

        assert_eq!(timers.flags_of("alice_1").len(), 2);
        assert_eq!(timers.forget_plot("alice_1"), 4);
        assert_eq!(timers.len(), 2);
        assert!(timers.lifetime.is_active(&"bob_1".into()));
        assert!(timers.flags.is_active(&FlagKey::new("bob_1", "pvp")));
    }

    #[test]
    fn tables_live_in_the_directory() {
        let dir = test_dir::fresh("timers");
        let storage = Storage::Directory(dir.clone());
        {
            let mut timers = Timers::open(&storage).unwrap();
            timers.vertical.activate("alice_1".into(), Duration::from_secs(300),
                VerticalRestore { min_y: 57, max_y: 71, anchor_y: 64 }, Time::from_seconds(0));
        }
        assert!(dir.join(VERTICAL_FILE).is_file());
        let timers = Timers::open(&storage).unwrap();
        assert_eq!(timers.vertical.get(&"alice_1".into()).map(|e| e.restore.anchor_y), Some(64));
    }
}
