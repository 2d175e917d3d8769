use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use colored::*;

use plotkeeper_core::config::Config;
use plotkeeper_core::env::OUTLINES_FILE;
use plotkeeper_core::error::Error;
use plotkeeper_core::events::Notice;
use plotkeeper_core::outline::OutlineStore;
use plotkeeper_core::storage::{Encoding, Storage};
use plotkeeper_core::time::Time;
use plotkeeper_core::timed::{TimedEntry, Timers};

/// Print everything persisted in the work directory, optionally for a single plot.
pub fn status(workdir: &Path, config: &Config, only: Option<&str>) -> Result<(), Error> {
    let storage = Storage::Directory(workdir.to_owned());
    let timers = Timers::open(&storage)?;
    let outlines = OutlineStore::open(storage.table(OUTLINES_FILE, Encoding::Bincode))?;
    let now = Time::current();
    let shown = |plot: &str| only.map_or(true, |p| p == plot);

    let (low, high) = thresholds(config);
    let mut rows = 0;
    for (plot, entry) in timers.lifetime.iter().filter(|&(p, _)| shown(p.as_str())) {
        print_entry("LIFE:", plot, entry, now, low, high);
        rows += 1;
    }
    for (plot, entry) in timers.vertical.iter().filter(|&(p, _)| shown(p.as_str())) {
        print_entry("VERT:", plot, entry, now, low, high);
        rows += 1;
    }
    for (key, entry) in timers.flags.iter().filter(|&(k, _)| shown(k.plot.as_str())) {
        print_entry("FLAG:", key, entry, now, low, high);
        rows += 1;
    }

    for plot in outlines.plots().into_iter().filter(|p| shown(p.as_str())) {
        let voxels = outlines.get(&plot).map_or(0, |r| r.len());
        println!("{}\t{}\t{} marker(s)", "LINE:".bold(), plot, voxels.to_string().yellow());
        rows += 1;
    }

    if rows == 0 {
        println!("Nothing recorded{}.", only.map_or(String::new(), |p| format!(" for {}", p)));
    }
    Ok(())
}

/// Print a notice as its recipient would get it.
pub fn notice(now: Time, notice: &Notice) {
    let text = match *notice {
        Notice::ExpiryWarning { .. } => notice.to_string().yellow(),
        Notice::Expired { .. } => notice.to_string().red(),
        Notice::ConfirmationTimedOut { .. } => notice.to_string().cyan(),
        Notice::Refunded { .. } => notice.to_string().green(),
    };
    println!("{:?}\t{}", now, text);
}

fn print_entry<K: Display, V>(label: &str, key: K, entry: &TimedEntry<V>, now: Time, low: Duration, high: Duration) {
    let remaining = match entry.remaining(now) {
        Some(r) => remaining_print(r, low, high),
        None => "expired".red().bold()
    };
    println!("{}\t{}\t{}\tuntil {:?}", label.bold(), key, remaining, entry.expires_at);
}

/// The last and first warning, as durations.
fn thresholds(config: &Config) -> (Duration, Duration) {
    let minutes = |m: Option<&u64>| Duration::from_secs(m.cloned().unwrap_or(0) * 60);
    (minutes(config.warning_minutes.iter().min()), minutes(config.warning_minutes.iter().max()))
}

/// Returns a colored representation of the remaining time.
/// Prints red once the last warning has been given
/// Prints cyan between the first and last warning
/// Prints green otherwise
fn remaining_print(remaining: Duration, low: Duration, high: Duration) -> ColoredString {
    let text = format_remaining(remaining);
    if remaining <= low {
        text.red()
    }
    else if remaining <= high {
        text.cyan()
    }
    else {
        text.green()
    }
}

fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m {}s", mins, secs)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_compact() {
        assert_eq!(format_remaining(Duration::from_secs(59)), "0m 59s");
        assert_eq!(format_remaining(Duration::from_secs(3 * 3600 + 120)), "3h 2m");
        assert_eq!(format_remaining(Duration::from_secs(2 * 86_400 + 5 * 3600)), "2d 5h");
    }

    #[test]
    fn thresholds_span_the_warnings() {
        let config = Config::default();
        assert_eq!(thresholds(&config), (Duration::from_secs(60), Duration::from_secs(1800)));
    }
}
