use error::Error;
use events::{Notice, TimedKind};
use host::Host;
use primitives::PlotId;
use std::fmt;
use super::context::Context;
use timed::{ExpiryHandler, FlagKey, FlagStore, TimedEntry, VerticalRestore, VerticalStore};

/// The end of a plot's lifetime: the plot is reclaimed along with its other timed state.
pub struct LifetimeExpiry<'a, H: 'a> {
    pub ctx: &'a mut Context<H>,
    pub vertical: &'a mut VerticalStore,
    pub flags: &'a mut FlagStore,
}

impl<'a, H: Host> ExpiryHandler<PlotId, ()> for LifetimeExpiry<'a, H> {
    fn expired(&mut self, id: &PlotId, entry: TimedEntry<()>) -> Result<(), TimedEntry<()>> {
        let owner = self.ctx.host.regions().region(id).map(|p| p.owner);
        match self.ctx.reclaim(id) {
            Ok(Some(_)) => info!("Plot {} reached the end of its lifetime and was reclaimed", id),
            Ok(None) => debug!("Expired plot {} was already gone", id),
            Err(e) => return retry_or_drop("reclaim expired plot", id, e, entry)
        }

        self.vertical.deactivate(id);
        self.flags.retain(|k, _| k.plot != *id);
        if let Some(owner) = owner {
            self.ctx.notify(&owner, Notice::Expired { kind: TimedKind::Lifetime, plot: id.clone(), flag: None });
        }
        Ok(())
    }

    fn warning(&mut self, id: &PlotId, _entry: &TimedEntry<()>, minutes: u64) {
        self.ctx.notify_owner(id, Notice::ExpiryWarning {
            kind: TimedKind::Lifetime, plot: id.clone(), flag: None, minutes
        });
    }
}


/// The end of a vertical expansion: the plot gets its level-derived height back.
pub struct VerticalExpiry<'a, H: 'a> {
    pub ctx: &'a mut Context<H>,
}

impl<'a, H: Host> ExpiryHandler<PlotId, VerticalRestore> for VerticalExpiry<'a, H> {
    fn expired(&mut self, id: &PlotId, entry: TimedEntry<VerticalRestore>) -> Result<(), TimedEntry<VerticalRestore>> {
        if let Err(e) = self.ctx.restore_vertical(id, &entry.restore) {
            return retry_or_drop("restore the height of plot", id, e, entry)
        }
        info!("Vertical expansion of plot {} ended", id);
        self.ctx.notify_owner(id, Notice::Expired { kind: TimedKind::VerticalExpansion, plot: id.clone(), flag: None });
        Ok(())
    }

    fn warning(&mut self, id: &PlotId, _entry: &TimedEntry<VerticalRestore>, minutes: u64) {
        self.ctx.notify_owner(id, Notice::ExpiryWarning {
            kind: TimedKind::VerticalExpansion, plot: id.clone(), flag: None, minutes
        });
    }
}


/// The end of a flag rental: the flag gets its previous value back.
pub struct FlagExpiry<'a, H: 'a> {
    pub ctx: &'a mut Context<H>,
}

impl<'a, H: Host> ExpiryHandler<FlagKey, Option<String>> for FlagExpiry<'a, H> {
    fn expired(&mut self, key: &FlagKey, entry: TimedEntry<Option<String>>) -> Result<(), TimedEntry<Option<String>>> {
        if let Err(e) = self.ctx.restore_flag(key, &entry.restore) {
            return retry_or_drop("restore flag", key, e, entry)
        }
        info!("Rental of flag {} ended", key);
        self.ctx.notify_owner(&key.plot, Notice::Expired {
            kind: TimedKind::FlagRental, plot: key.plot.clone(), flag: Some(key.flag.clone())
        });
        Ok(())
    }

    fn warning(&mut self, key: &FlagKey, _entry: &TimedEntry<Option<String>>, minutes: u64) {
        self.ctx.notify_owner(&key.plot, Notice::ExpiryWarning {
            kind: TimedKind::FlagRental, plot: key.plot.clone(), flag: Some(key.flag.clone()), minutes
        });
    }
}


/// Hand the entry back when the authority was left untouched; anything else (the plot is gone or
/// lost) has nothing left to restore.
fn retry_or_drop<K: fmt::Display, V>(what: &str, key: &K, e: Error, entry: TimedEntry<V>) -> Result<(), TimedEntry<V>> {
    if e.left_unchanged() {
        warn!("Could not {} {}: {}", what, key, e);
        Err(entry)
    } else {
        error!("Could not {} {}, dropping its timer: {}", what, key, e);
        Ok(())
    }
}
