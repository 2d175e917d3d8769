use std::fmt::Debug;
use std::time::Duration;
use super::store::{TimedEntry, TimedStateStore};
use time::Time;

const MINUTE_MS: i64 = 60 * 1000;

/// What the owner of a timed feature does when it runs out or is about to.
pub trait ExpiryHandler<K, V> {
    /// The entry has already been removed from its store when this is called, so it can never be
    /// handled twice. Handing it back as `Err` puts it back in the store to be retried on the next
    /// sweep; that is for restorations which failed but left everything as it was.
    fn expired(&mut self, key: &K, entry: TimedEntry<V>) -> Result<(), TimedEntry<V>>;
    fn warning(&mut self, key: &K, entry: &TimedEntry<V>, minutes: u64);
}

/// Counts from one sweep, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    /// Expired entries whose handler failed and which stay for the next sweep.
    pub retried: usize,
    pub warned: usize,
    /// Thresholds whose window had already passed, marked without a notice.
    pub skipped: usize,
}

/// Runs sweeps over timed stores at a fixed period.
#[derive(Debug, Clone)]
pub struct TimedStateScheduler {
    period: Duration,
    thresholds: Vec<u64>,
    next_tick: Option<Time>,
}

impl TimedStateScheduler {
    /// `thresholds` are the minutes-before-expiry at which owners are warned.
    pub fn new(period: Duration, mut thresholds: Vec<u64>) -> TimedStateScheduler {
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();
        TimedStateScheduler { period, thresholds, next_tick: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// True when a tick is due at `now`, in which case the next one is scheduled a period later.
    /// The first call is always due.
    pub fn due(&mut self, now: Time) -> bool {
        match self.next_tick {
            Some(next) if now < next => false,
            _ => {
                self.next_tick = Some(now.after(self.period));
                true
            }
        }
    }

    /// Expire and warn every entry of one store.
    ///
    /// An entry whose expiry has been reached is removed and handed to the handler, and put back if
    /// the handler gives it back. For the rest,
    /// every threshold not yet dealt with whose time has come is marked; it is announced only when
    /// the remaining time is still inside its one-minute window (`remaining <= t` and
    /// `remaining > t - 1` minutes), so a threshold fires at most once per activation however long
    /// the gap between sweeps.
    pub fn sweep<K, V, H>(&self, store: &mut TimedStateStore<K, V>, now: Time, handler: &mut H) -> SweepReport
        where K: Ord + Clone + Debug, V: Clone, H: ExpiryHandler<K, V>
    {
        let mut report = SweepReport::default();

        for key in store.expired(now) {
            if let Some(entry) = store.deactivate(&key) {
                debug!("{} of {:?} expired", store.kind(), key);
                match handler.expired(&key, entry) {
                    Ok(()) => report.expired += 1,
                    Err(entry) => {
                        warn!("{} of {:?} could not be ended, retrying next tick", store.kind(), key);
                        store.reinstate(key, entry);
                        report.retried += 1;
                    }
                }
            }
        }

        let mut marks = Vec::new();
        let mut announce = Vec::new();
        for (key, entry) in store.iter() {
            let remaining = entry.expires_at.millis() - now.millis();
            if remaining <= 0 { continue; }
            for &t in &self.thresholds {
                if entry.warned.contains(&t) { continue; }
                let threshold = t as i64 * MINUTE_MS;
                if remaining > threshold { continue; }

                marks.push((key.clone(), t));
                if remaining > threshold - MINUTE_MS {
                    announce.push((key.clone(), t));
                } else {
                    report.skipped += 1;
                }
            }
        }
        store.mark_warned(&marks);

        for (key, minutes) in announce {
            if let Some(entry) = store.get(&key) {
                report.warned += 1;
                handler.warning(&key, entry, minutes);
            }
        }

        if report.skipped > 0 {
            debug!("Dropped {} stale {} warning(s)", report.skipped, store.kind());
        }
        report
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use events::TimedKind;
    use storage::Volatile;

    #[derive(Default)]
    struct Recorder {
        expired: Vec<(String, i32)>,
        warnings: Vec<(String, u64)>,
        /// Number of upcoming expiries to hand back.
        refusals: usize,
    }

    impl ExpiryHandler<String, i32> for Recorder {
        fn expired(&mut self, key: &String, entry: TimedEntry<i32>) -> Result<(), TimedEntry<i32>> {
            if self.refusals > 0 {
                self.refusals -= 1;
                return Err(entry)
            }
            self.expired.push((key.clone(), entry.restore));
            Ok(())
        }

        fn warning(&mut self, key: &String, _entry: &TimedEntry<i32>, minutes: u64) {
            self.warnings.push((key.clone(), minutes));
        }
    }

    fn store() -> TimedStateStore<String, i32> {
        TimedStateStore::open(TimedKind::VerticalExpansion, Box::new(Volatile::new())).unwrap()
    }

    fn scheduler() -> TimedStateScheduler {
        TimedStateScheduler::new(Duration::from_secs(1), vec![1, 30, 10, 5])
    }

    #[test]
    fn due_once_per_period() {
        let mut s = scheduler();
        let t0 = Time::from_seconds(100);
        assert!(s.due(t0));
        assert!(!s.due(Time::from_milliseconds(100_999)));
        assert!(s.due(Time::from_seconds(101)));
        assert!(!s.due(Time::from_seconds(101)));
    }

    #[test]
    fn expires_exactly_once() {
        let (mut store, sched, mut rec) = (store(), scheduler(), Recorder::default());
        let start = Time::from_seconds(0);
        store.activate("alice_1".into(), Duration::from_secs(300), 42, start);

        let mut now = start;
        for _ in 0..400 {
            sched.sweep(&mut store, now, &mut rec);
            now = now.after(Duration::from_secs(1));
        }
        assert_eq!(rec.expired, vec![("alice_1".to_owned(), 42)]);
        assert!(store.is_empty());
    }

    #[test]
    fn handed_back_entries_are_retried() {
        let (mut store, sched) = (store(), scheduler());
        let mut rec = Recorder { refusals: 2, ..Recorder::default() };
        let start = Time::from_seconds(0);
        store.activate("alice_1".into(), Duration::from_secs(60), 7, start);

        let due = start.after(Duration::from_secs(60));
        let report = sched.sweep(&mut store, due, &mut rec);
        assert_eq!((report.expired, report.retried, report.warned), (0, 1, 0));
        assert!(store.is_active(&"alice_1".into()));
        assert_eq!(store.get(&"alice_1".into()).map(|e| e.restore), Some(7));

        sched.sweep(&mut store, due.after(Duration::from_secs(1)), &mut rec);
        let report = sched.sweep(&mut store, due.after(Duration::from_secs(2)), &mut rec);
        assert_eq!((report.expired, report.retried), (1, 0));
        assert_eq!(rec.expired, vec![("alice_1".to_owned(), 7)]);
        assert!(store.is_empty());
    }

    #[test]
    fn each_threshold_fires_once_per_activation() {
        let (mut store, sched, mut rec) = (store(), scheduler(), Recorder::default());
        let start = Time::from_seconds(0);
        store.activate("p".into(), Duration::from_secs(31 * 60), 0, start);

        let mut now = start;
        while now < start.after(Duration::from_secs(31 * 60 - 30)) {
            sched.sweep(&mut store, now, &mut rec);
            now = now.after(Duration::from_secs(1));
        }
        let fired: Vec<u64> = rec.warnings.iter().map(|&(_, m)| m).collect();
        assert_eq!(fired, vec![30, 10, 5, 1]);
        assert!(rec.expired.is_empty());

        // renewal clears the sent set, so thresholds can fire again
        store.activate("p".into(), Duration::from_secs(9 * 60 + 30), 0, now);
        sched.sweep(&mut store, now, &mut rec);
        assert_eq!(rec.warnings.last(), Some(&("p".to_owned(), 10)));
    }

    #[test]
    fn skipped_windows_are_dropped_silently() {
        let (mut store, sched, mut rec) = (store(), scheduler(), Recorder::default());
        let start = Time::from_seconds(0);
        store.activate("p".into(), Duration::from_secs(60 * 60), 0, start);

        // first sweep after a long pause: 4.5 minutes left
        let late = start.after(Duration::from_secs(55 * 60 + 30));
        let report = sched.sweep(&mut store, late, &mut rec);
        assert_eq!(report, SweepReport { expired: 0, retried: 0, warned: 1, skipped: 2 });
        assert_eq!(rec.warnings, vec![("p".to_owned(), 5)]);

        let warned = &store.get(&"p".into()).unwrap().warned;
        assert!(warned.contains(&30) && warned.contains(&10) && warned.contains(&5));
        assert!(!warned.contains(&1));
    }
}
