use collision::CollisionResolver;
use error::{Error, MutationError, ValidationError};
use events::Notice;
use geometry::Geometry;
use host::Host;
use mutator::AtomicRegionMutator;
use outline::GroundSearchBorderPlacer;
use primitives::{Money, OwnerId, Plot};
use timed::{FlagKey, VerticalRestore, VerticalStore};

/// The host together with everything that changes what the host holds. Kept apart from the timed
/// stores so an expiry handler can borrow this while the scheduler holds a store.
pub struct Context<H> {
    pub host: H,
    pub placer: GroundSearchBorderPlacer,
    pub geometry: Geometry,
    pub collision: CollisionResolver,
    pub mutator: AtomicRegionMutator,
    pub world: String,
}

impl<H: Host> Context<H> {
    /// Every plot of the managed world.
    pub fn plots(&self) -> Vec<Plot> {
        self.host.regions().regions(&self.world)
    }

    pub fn plot(&self, id: &str) -> Result<Plot, Error> {
        match self.host.regions().region(id) {
            Some(ref p) if p.world == self.world => Ok(p.clone()),
            _ => Err(Error::StaleReference(id.to_owned()))
        }
    }

    pub fn owned_plot(&self, owner: &OwnerId, id: &str) -> Result<Plot, Error> {
        let plot = self.plot(id)?;
        if !plot.is_owned_by(owner) {
            return Err(ValidationError::NotOwner.into())
        }
        Ok(plot)
    }

    /// The level of a plot, logging a data-integrity warning when its bounds have none.
    pub fn level_of(&self, plot: &Plot) -> Result<u32, Error> {
        self.geometry.level_of(plot.bounds).map_err(|issue| {
            warn!("Data integrity: plot {} {}", plot.id, issue);
            Error::Integrity { plot: plot.id.clone(), issue }
        })
    }

    pub fn world_height(&self) -> (i32, i32) {
        let grid = self.host.grid();
        (grid.min_height(), grid.max_height())
    }

    /// Remove and place the outline of a plot.
    pub fn redraw(&mut self, plot: &Plot, anchor_y: i32) {
        self.placer.place(self.host.grid_mut(), plot, anchor_y);
    }

    pub fn erase(&mut self, id: &str) -> usize {
        self.placer.remove(self.host.grid_mut(), id)
    }

    pub fn save_regions(&mut self) {
        if let Err(e) = self.host.regions_mut().save() {
            error!("Could not save region authority: {}", e);
        }
    }

    pub fn charge(&mut self, owner: &OwnerId, amount: Money) -> Result<(), Error> {
        if amount == 0 { return Ok(()) }

        let economy = self.host.economy();
        let balance = economy.balance(owner);
        if balance < amount {
            return Err(ValidationError::InsufficientFunds { needed: amount, balance }.into())
        }
        economy.withdraw(owner, amount).map_err(|e| {
            debug!("Withdrawal of {} from {} refused: {}", amount, owner, e);
            Error::from(ValidationError::InsufficientFunds { needed: amount, balance })
        })
    }

    /// Give back money taken for an operation which then failed.
    pub fn refund(&mut self, owner: &OwnerId, amount: Money, reason: &Error) {
        if amount == 0 { return }
        self.host.economy().deposit(owner, amount);
        info!("Refunded {} to {}: {}", amount, owner, reason);
        self.notify(owner, Notice::Refunded { amount, reason: reason.to_string() });
    }

    /// Deliver a notice if its recipient is online to see it.
    pub fn notify(&mut self, owner: &OwnerId, notice: Notice) {
        if self.host.identity().is_online(owner) {
            self.host.notify(owner, notice);
        } else {
            debug!("{} is offline, dropped notice: {}", owner, notice);
        }
    }

    /// Notify the owner of a plot, if the plot still exists.
    pub fn notify_owner(&mut self, id: &str, notice: Notice) {
        if let Some(owner) = self.host.regions().region(id).map(|p| p.owner) {
            self.notify(&owner, notice);
        }
    }

    /// Undo a vertical expansion. The range is recomputed from the recorded anchor at the plot's
    /// current level, so expanding during the boost is honoured. A plot which is gone is nothing
    /// to restore.
    pub fn restore_vertical(&mut self, id: &str, restore: &VerticalRestore) -> Result<(), Error> {
        let plot = match self.host.regions().region(id) {
            Some(p) => p,
            None => {
                debug!("Plot {} is gone, no vertical range to restore", id);
                return Ok(())
            }
        };

        let (min_y, max_y) = match self.geometry.level_of(plot.bounds) {
            Ok(level) => self.geometry.vertical_for_level(restore.anchor_y, level),
            Err(issue) => {
                warn!("Data integrity: plot {} {}; restoring its recorded height", id, issue);
                (restore.min_y, restore.max_y)
            }
        };
        let (world_min, world_max) = self.world_height();
        if min_y < world_min || max_y > world_max {
            warn!("Data integrity: plot {} would return to Y {}..{} outside the world, clamping", id, min_y, max_y);
        }
        let (min_y, max_y) = (min_y.max(world_min), max_y.min(world_max));

        let restored = self.mutator.commit_vertical(self.host.regions_mut(), id, min_y, max_y)?;
        self.redraw(&restored, restore.anchor_y);
        Ok(())
    }

    /// Put back the value a flag had before it was rented.
    pub fn restore_flag(&mut self, key: &FlagKey, previous: &Option<String>) -> Result<(), Error> {
        let plot = match self.host.regions().region(&key.plot) {
            Some(p) => p,
            None => {
                debug!("Plot {} is gone, no flag to restore", key.plot);
                return Ok(())
            }
        };

        let mut flags = plot.flags.clone();
        match *previous {
            Some(ref value) => { flags.insert(key.flag.clone(), value.clone()); },
            None => { flags.remove(&key.flag); }
        }
        self.mutator.commit_flags(self.host.regions_mut(), &key.plot, flags)?;
        Ok(())
    }

    /// Remove a plot from the authority and take its outline down. Returns the removed plot, or
    /// `None` if it was already gone.
    pub fn reclaim(&mut self, id: &str) -> Result<Option<Plot>, Error> {
        let removed = self.host.regions_mut().remove_region(id)
            .map_err(|e| MutationError::Rejected { id: id.to_owned(), reason: e.to_string() })?;
        self.save_regions();
        self.erase(id);
        Ok(removed)
    }
}

/// The height outline searches start from: the recorded anchor while a vertical expansion is
/// active, otherwise the center of the plot.
pub fn anchor_of(plot: &Plot, vertical: &VerticalStore) -> i32 {
    vertical.get(&plot.id)
        .map(|e| e.restore.anchor_y)
        .unwrap_or_else(|| plot.bounds.center().y())
}
