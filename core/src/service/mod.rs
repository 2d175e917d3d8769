//! The plot service: every operation players and the scheduler perform on plots.

mod context;
mod expiry;
pub mod pricing;


use collision::CollisionResolver;
use config::Config;
use env::OUTLINES_FILE;
use error::{Error, MutationError, ValidationError};
use events::Notice;
use geometry::Geometry;
use host::Host;
use mutator::AtomicRegionMutator;
use outline::{GroundSearchBorderPlacer, OutlineStore};
use pending::{PendingOp, PendingOperations, Purchase};
use primitives::{BoundingBox, Coord, Money, OwnerId, Plot, PlotId};
use self::context::{anchor_of, Context};
use self::expiry::{FlagExpiry, LifetimeExpiry, VerticalExpiry};
use self::pricing::{expansion_price, per_started_day, per_started_minute};
use std::collections::BTreeSet;
use std::time::Duration;
use storage::{Encoding, Storage};
use time::{Clock, Time};
use timed::{FlagKey, TimedStateScheduler, Timers, VerticalRestore};

/// A price and how long it may be confirmed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub price: Money,
    pub expires_at: Time,
}

/// What a resynchronization pass found and did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResyncReport {
    /// Timed entries of plots which no longer exist.
    pub discarded_timers: usize,
    /// Outlines of plots which no longer exist.
    pub discarded_outlines: usize,
    /// Vertical ranges and flag values put back to what their timed entry says.
    pub repaired: usize,
    pub redrawn: usize,
    pub integrity_issues: usize,
}

/// Manages the plots of one world on behalf of a host.
///
/// Every operation runs to completion on the caller's thread; the host is expected to call
/// `tick` regularly from the same thread that calls everything else. Money is taken only after a
/// request has been validated and is given back if anything after the withdrawal fails.
pub struct PlotService<H> {
    config: Config,
    clock: Box<dyn Clock>,
    ctx: Context<H>,
    timers: Timers,
    pending: PendingOperations,
    scheduler: TimedStateScheduler,
    next_resync: Option<Time>,
}

impl<H: Host> PlotService<H> {
    /// Build a service over `host`, resuming any timed state and outline records in `storage`.
    pub fn open(config: Config, host: H, clock: Box<dyn Clock>, storage: &Storage) -> Result<PlotService<H>, Error> {
        config.validate()?;

        let records = OutlineStore::open(storage.table(OUTLINES_FILE, Encoding::Bincode))?;
        let timers = Timers::open(storage)?;
        let now = clock.now();
        info!("Managing world '{}' with {} timed entr{} and {} outline(s)", config.world, timers.len(),
            if timers.len() == 1 { "y" } else { "ies" }, records.len());

        let ctx = Context {
            host,
            placer: GroundSearchBorderPlacer::new(config.outline.clone(), config.materials.clone(), records),
            geometry: Geometry::from_config(&config),
            collision: CollisionResolver::new(config.max_plots_per_owner),
            mutator: AtomicRegionMutator::new(),
            world: config.world.clone(),
        };

        Ok(PlotService {
            scheduler: TimedStateScheduler::new(config.tick_period(), config.warning_minutes.clone()),
            next_resync: config.resync_period().map(|p| now.after(p)),
            pending: PendingOperations::new(),
            config, clock, ctx, timers,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.ctx.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.ctx.host
    }

    /// Shut the service down, handing the host back. Everything persisted stays where it is.
    pub fn into_host(self) -> H {
        self.ctx.host
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn now(&self) -> Time {
        self.clock.now()
    }


    // ---- plots ----

    /// Claim a new level 0 plot centered on `center` for `owner`.
    pub fn create_plot(&mut self, owner: &OwnerId, center: Coord) -> Result<Plot, Error> {
        let name = self.ctx.host.identity().name_of(owner).ok_or(ValidationError::UnknownPlayer)?;
        let bounds = self.ctx.geometry.base_bounds(center);
        self.check_in_world(bounds)?;
        self.ctx.collision.check_new_claim(bounds, owner, &self.ctx.plots())?;

        let price = self.config.creation_price;
        self.ctx.charge(owner, price)?;

        let id = self.next_plot_id(&name);
        let plot = Plot::new(id.clone(), &self.config.world, owner.clone(), bounds, self.config.default_priority);
        if let Err(e) = self.ctx.host.regions_mut().add_region(plot.clone()) {
            let err = Error::from(MutationError::Rejected { id, reason: e.to_string() });
            self.ctx.refund(owner, price, &err);
            return Err(err)
        }
        self.ctx.save_regions();
        self.ctx.redraw(&plot, center.y());

        if self.config.plot_lifetime_secs > 0 {
            let now = self.now();
            self.timers.lifetime.activate(id.clone(), Duration::from_secs(self.config.plot_lifetime_secs), (), now);
        }
        info!("{} claimed plot {} at {}", name, id, bounds);
        Ok(plot)
    }

    /// Grow a plot to `level`. Levels only go up.
    pub fn expand_plot(&mut self, owner: &OwnerId, id: &str, level: u32) -> Result<Plot, Error> {
        let (candidate, price) = self.plan_expansion(owner, id, level)?;
        self.ctx.charge(owner, price)?;

        let grown = match self.ctx.mutator.commit(self.ctx.host.regions_mut(), id, candidate) {
            Ok(p) => p,
            Err(e) => {
                let err = Error::from(e);
                self.ctx.refund(owner, price, &err);
                return Err(err)
            }
        };

        let anchor = anchor_of(&grown, &self.timers.vertical);
        self.ctx.redraw(&grown, anchor);
        info!("Plot {} expanded to level {}", id, level);
        Ok(grown)
    }

    /// Delete a plot outright, taking down its outline and all its timed state.
    pub fn delete_plot(&mut self, id: &str) -> Result<Plot, Error> {
        let plot = self.ctx.plot(id)?;
        self.ctx.reclaim(id)?;
        let dropped = self.timers.forget_plot(id);
        info!("Plot {} deleted ({} timed entr{} dropped)", id, dropped, if dropped == 1 { "y" } else { "ies" });
        Ok(plot)
    }

    /// Validate an expansion without changing anything: the candidate bounds and the price.
    fn plan_expansion(&self, owner: &OwnerId, id: &str, level: u32) -> Result<(BoundingBox, Money), Error> {
        let plot = self.ctx.owned_plot(owner, id)?;
        let max = self.ctx.geometry.max_level;
        if level > max {
            return Err(ValidationError::LevelOutOfRange { requested: level, max }.into())
        }
        let current = self.ctx.level_of(&plot)?;
        if level <= current {
            return Err(ValidationError::LevelNotIncreasing { current, requested: level }.into())
        }

        // An active vertical expansion keeps its world-height range while the footprint grows. The
        // height the plot returns to afterwards has to fit the world as well.
        let pinned = match self.timers.vertical.get(&plot.id) {
            Some(entry) => {
                let (min_y, max_y) = self.ctx.geometry.vertical_for_level(entry.restore.anchor_y, level);
                self.check_in_world(plot.bounds.with_y_range(min_y, max_y))?;
                Some((plot.bounds.min().y(), plot.bounds.max().y()))
            },
            None => None
        };
        let candidate = self.ctx.geometry.bounds_for_level(plot.bounds, level, pinned);
        self.check_in_world(candidate)?;
        self.ctx.collision.check_placement(candidate, owner, &self.ctx.plots())?;

        Ok((candidate, expansion_price(self.config.level_price, current, level)))
    }

    fn check_in_world(&self, bounds: BoundingBox) -> Result<(), Error> {
        let (min_y, max_y) = self.ctx.world_height();
        if bounds.min().y() < min_y || bounds.max().y() > max_y {
            return Err(ValidationError::OutsideWorld.into())
        }
        Ok(())
    }

    /// `<name>_<n>` with the lowest n not taken.
    fn next_plot_id(&self, name: &str) -> PlotId {
        let base = name.to_lowercase();
        let regions = self.ctx.host.regions();
        let mut n = 1;
        loop {
            let id = format!("{}_{}", base, n);
            if regions.region(&id).is_none() { return id }
            n += 1;
        }
    }


    // ---- timed features ----

    /// Stretch a plot to the full world height for `seconds`. Buying again while active adds time.
    pub fn activate_vertical_expansion(&mut self, owner: &OwnerId, id: &str, seconds: u64) -> Result<Time, Error> {
        let duration = self.check_rental(seconds)?;
        let plot = self.ctx.owned_plot(owner, id)?;
        let price = per_started_minute(seconds, self.config.vertical_price_per_minute);
        let now = self.now();

        if let Some(restore) = self.timers.vertical.get(&plot.id).map(|e| e.restore) {
            self.ctx.charge(owner, price)?;
            return Ok(self.timers.vertical.activate(plot.id, duration, restore, now))
        }

        let (min_y, max_y) = self.ctx.world_height();
        self.ctx.collision.check_placement(plot.bounds.with_y_range(min_y, max_y), owner, &self.ctx.plots())?;
        self.ctx.charge(owner, price)?;

        let restore = VerticalRestore {
            min_y: plot.bounds.min().y(),
            max_y: plot.bounds.max().y(),
            anchor_y: plot.bounds.center().y(),
        };
        let pinned = match self.ctx.mutator.commit_vertical(self.ctx.host.regions_mut(), id, min_y, max_y) {
            Ok(p) => p,
            Err(e) => {
                let err = Error::from(e);
                self.ctx.refund(owner, price, &err);
                return Err(err)
            }
        };

        let expires_at = self.timers.vertical.activate(plot.id.clone(), duration, restore, now);
        self.ctx.redraw(&pinned, restore.anchor_y);
        info!("Plot {} expanded vertically until {:?}", id, expires_at);
        Ok(expires_at)
    }

    /// End a vertical expansion early. Nothing is refunded.
    pub fn deactivate_vertical_expansion(&mut self, owner: &OwnerId, id: &str) -> Result<(), Error> {
        let plot = self.ctx.owned_plot(owner, id)?;
        let entry = self.timers.vertical.deactivate(&plot.id).ok_or(ValidationError::NotActive)?;
        if let Err(e) = self.ctx.restore_vertical(id, &entry.restore) {
            self.timers.vertical.reinstate(plot.id, entry);
            return Err(e)
        }
        info!("Vertical expansion of plot {} ended by its owner", id);
        Ok(())
    }

    /// Rent a flag on a plot for `seconds`. Renting again while active adds time.
    pub fn activate_flag(&mut self, owner: &OwnerId, id: &str, flag: &str, seconds: u64) -> Result<Time, Error> {
        let offer = self.config.rentable_flags.get(flag).cloned()
            .ok_or_else(|| ValidationError::UnknownFlag(flag.to_owned()))?;
        let duration = self.check_rental(seconds)?;
        let plot = self.ctx.owned_plot(owner, id)?;
        let price = per_started_minute(seconds, offer.price_per_minute);
        let key = FlagKey::new(id, flag);
        let now = self.now();

        if let Some(previous) = self.timers.flags.get(&key).map(|e| e.restore.clone()) {
            self.ctx.charge(owner, price)?;
            return Ok(self.timers.flags.activate(key, duration, previous, now))
        }

        self.ctx.charge(owner, price)?;
        let previous = plot.flags.get(flag).cloned();
        let mut flags = plot.flags.clone();
        flags.insert(flag.to_owned(), offer.value.clone());
        if let Err(e) = self.ctx.mutator.commit_flags(self.ctx.host.regions_mut(), id, flags) {
            let err = Error::from(e);
            self.ctx.refund(owner, price, &err);
            return Err(err)
        }

        let expires_at = self.timers.flags.activate(key, duration, previous, now);
        info!("Flag {} set to '{}' on plot {} until {:?}", flag, offer.value, id, expires_at);
        Ok(expires_at)
    }

    /// End a flag rental early, putting back the previous value. Nothing is refunded.
    pub fn deactivate_flag(&mut self, owner: &OwnerId, id: &str, flag: &str) -> Result<(), Error> {
        self.ctx.owned_plot(owner, id)?;
        let key = FlagKey::new(id, flag);
        let entry = self.timers.flags.deactivate(&key).ok_or(ValidationError::NotActive)?;
        if let Err(e) = self.ctx.restore_flag(&key, &entry.restore) {
            self.timers.flags.reinstate(key, entry);
            return Err(e)
        }
        info!("Rental of flag {} on plot {} ended by its owner", flag, id);
        Ok(())
    }

    /// Add `seconds` to the lifetime of a plot.
    pub fn renew_lifetime(&mut self, owner: &OwnerId, id: &str, seconds: u64) -> Result<Time, Error> {
        self.check_renewal(owner, id, seconds)?;
        let price = per_started_day(seconds, self.config.lifetime_price_per_day);
        self.ctx.charge(owner, price)?;
        let now = self.now();
        let expires_at = self.timers.lifetime.activate(id.to_owned(), Duration::from_secs(seconds), (), now);
        info!("Lifetime of plot {} extended until {:?}", id, expires_at);
        Ok(expires_at)
    }

    fn check_rental(&self, seconds: u64) -> Result<Duration, Error> {
        let minimum_secs = self.config.min_rental_secs;
        if seconds < minimum_secs || seconds == 0 {
            return Err(ValidationError::DurationTooShort { minimum_secs: minimum_secs.max(1) }.into())
        }
        Ok(Duration::from_secs(seconds))
    }

    fn check_renewal(&self, owner: &OwnerId, id: &str, seconds: u64) -> Result<(), Error> {
        if seconds == 0 {
            return Err(ValidationError::DurationTooShort { minimum_secs: 1 }.into())
        }
        let plot = self.ctx.owned_plot(owner, id)?;
        if !self.timers.lifetime.is_active(&plot.id) {
            return Err(ValidationError::NotActive.into())
        }
        Ok(())
    }


    // ---- confirmations ----

    /// Ask for a plot to be deleted. It is deleted once `confirm_deletion` is called before the
    /// returned time.
    pub fn request_deletion(&mut self, owner: &OwnerId, id: &str) -> Result<Time, Error> {
        let plot = self.ctx.owned_plot(owner, id)?;
        let expires_at = self.now().after(Duration::from_secs(self.config.deletion_confirm_secs));
        if let Some(replaced) = self.pending.request(owner, PendingOp::Delete { plot: plot.id }, expires_at) {
            debug!("Pending operation of {} replaced: {}", owner, replaced);
        }
        Ok(expires_at)
    }

    pub fn confirm_deletion(&mut self, owner: &OwnerId) -> Result<Plot, Error> {
        let now = self.now();
        let id = match self.pending.get(owner, now) {
            Some(&PendingOp::Delete { ref plot }) => plot.clone(),
            _ => return Err(ValidationError::NoPendingOperation.into())
        };
        self.pending.take(owner, now);
        self.ctx.owned_plot(owner, &id)?;
        self.delete_plot(&id)
    }

    /// Validate a purchase and price it. The price holds until it is confirmed or times out.
    pub fn quote_purchase(&mut self, owner: &OwnerId, purchase: Purchase) -> Result<Quote, Error> {
        let price = self.price_of(owner, &purchase)?;
        let balance = self.ctx.host.economy().balance(owner);
        if balance < price {
            return Err(ValidationError::InsufficientFunds { needed: price, balance }.into())
        }

        let expires_at = self.now().after(Duration::from_secs(self.config.purchase_confirm_secs));
        if let Some(replaced) = self.pending.request(owner, PendingOp::Purchase { purchase, price }, expires_at) {
            debug!("Pending operation of {} replaced: {}", owner, replaced);
        }
        Ok(Quote { price, expires_at })
    }

    /// Carry out the purchase quoted last. Everything is validated again, the quote only stands
    /// for the player's intent.
    pub fn confirm_purchase(&mut self, owner: &OwnerId) -> Result<Purchase, Error> {
        let now = self.now();
        let purchase = match self.pending.get(owner, now) {
            Some(&PendingOp::Purchase { ref purchase, .. }) => purchase.clone(),
            _ => return Err(ValidationError::NoPendingOperation.into())
        };
        self.pending.take(owner, now);

        match purchase {
            Purchase::Expand { ref plot, level } =>
                self.expand_plot(owner, plot, level).map(|_| ()),
            Purchase::VerticalExpansion { ref plot, seconds } =>
                self.activate_vertical_expansion(owner, plot, seconds).map(|_| ()),
            Purchase::FlagRental { ref plot, ref flag, seconds } =>
                self.activate_flag(owner, plot, flag, seconds).map(|_| ()),
            Purchase::LifetimeRenewal { ref plot, seconds } =>
                self.renew_lifetime(owner, plot, seconds).map(|_| ()),
        }?;
        Ok(purchase)
    }

    pub fn cancel_pending(&mut self, owner: &OwnerId) -> Option<PendingOp> {
        self.pending.cancel(owner)
    }

    pub fn pending(&self, owner: &OwnerId) -> Option<&PendingOp> {
        self.pending.get(owner, self.clock.now())
    }

    fn price_of(&self, owner: &OwnerId, purchase: &Purchase) -> Result<Money, Error> {
        match *purchase {
            Purchase::Expand { ref plot, level } =>
                self.plan_expansion(owner, plot, level).map(|(_, price)| price),
            Purchase::VerticalExpansion { ref plot, seconds } => {
                self.check_rental(seconds)?;
                let p = self.ctx.owned_plot(owner, plot)?;
                if !self.timers.vertical.is_active(&p.id) {
                    let (min_y, max_y) = self.ctx.world_height();
                    self.ctx.collision.check_placement(p.bounds.with_y_range(min_y, max_y), owner, &self.ctx.plots())?;
                }
                Ok(per_started_minute(seconds, self.config.vertical_price_per_minute))
            },
            Purchase::FlagRental { ref plot, ref flag, seconds } => {
                let offer = self.config.rentable_flags.get(flag)
                    .ok_or_else(|| ValidationError::UnknownFlag(flag.clone()))?;
                self.check_rental(seconds)?;
                self.ctx.owned_plot(owner, plot)?;
                Ok(per_started_minute(seconds, offer.price_per_minute))
            },
            Purchase::LifetimeRenewal { ref plot, seconds } => {
                self.check_renewal(owner, plot, seconds)?;
                Ok(per_started_day(seconds, self.config.lifetime_price_per_day))
            },
        }
    }


    // ---- scheduling ----

    /// Run one scheduler tick if one is due: time out confirmations, expire and warn timed state,
    /// and resynchronize when that is due too. Returns whether a tick ran.
    pub fn tick(&mut self) -> bool {
        let now = self.now();
        if !self.scheduler.due(now) { return false }

        for (owner, op) in self.pending.expire(now) {
            debug!("Confirmation of {} by {} timed out", op, owner);
            self.ctx.notify(&owner, Notice::ConfirmationTimedOut { what: op.to_string() });
        }

        self.sweep(now);

        if let Some(next) = self.next_resync {
            if now >= next {
                self.resync();
                self.next_resync = self.config.resync_period().map(|p| now.after(p));
            }
        }
        true
    }

    fn sweep(&mut self, now: Time) {
        let Timers { ref mut lifetime, ref mut vertical, ref mut flags } = self.timers;
        let ctx = &mut self.ctx;
        let scheduler = &self.scheduler;

        let v = scheduler.sweep(vertical, now, &mut VerticalExpiry { ctx: &mut *ctx });
        let f = scheduler.sweep(flags, now, &mut FlagExpiry { ctx: &mut *ctx });
        let l = scheduler.sweep(lifetime, now, &mut LifetimeExpiry { ctx, vertical, flags });

        let (expired, warned) = (v.expired + f.expired + l.expired, v.warned + f.warned + l.warned);
        let retried = v.retried + f.retried + l.retried;
        if expired + warned + retried > 0 {
            debug!("Tick at {:?}: {} expired, {} retried, {} warning(s)", now, expired, retried, warned);
        }
    }

    /// Bring outlines and timed state back in line with the plots the authority holds. Safe to
    /// run at any time; running it twice in a row changes nothing the second time.
    pub fn resync(&mut self) -> ResyncReport {
        let plots = self.ctx.plots();
        let live: BTreeSet<PlotId> = plots.iter().map(|p| p.id.clone()).collect();
        let mut report = ResyncReport::default();

        report.discarded_timers += self.timers.lifetime.retain(|k, _| live.contains(k)).len();
        report.discarded_timers += self.timers.vertical.retain(|k, _| live.contains(k)).len();
        report.discarded_timers += self.timers.flags.retain(|k, _| live.contains(&k.plot)).len();

        self.ctx.placer.hold_records();
        for id in self.ctx.placer.outlined() {
            if !live.contains(&id) {
                self.ctx.erase(&id);
                report.discarded_outlines += 1;
            }
        }

        let (min_y, max_y) = self.ctx.world_height();
        for mut plot in plots {
            if self.ctx.level_of(&plot).is_err() {
                report.integrity_issues += 1;
            }

            let pinned = (plot.bounds.min().y(), plot.bounds.max().y());
            if self.timers.vertical.is_active(&plot.id) && pinned != (min_y, max_y) {
                warn!("Vertical expansion of plot {} had drifted, pinning it again", plot.id);
                match self.ctx.mutator.commit_vertical(self.ctx.host.regions_mut(), &plot.id, min_y, max_y) {
                    Ok(p) => { plot = p; report.repaired += 1; },
                    Err(e) => error!("Could not pin plot {} again: {}", plot.id, e)
                }
            }

            for key in self.timers.flags_of(&plot.id) {
                let value = match self.config.rentable_flags.get(&key.flag) {
                    Some(offer) => offer.value.clone(),
                    None => continue
                };
                if plot.flags.get(&key.flag) == Some(&value) { continue; }

                warn!("Rented flag {} had drifted, setting it again", key);
                let mut flags = plot.flags.clone();
                flags.insert(key.flag.clone(), value);
                match self.ctx.mutator.commit_flags(self.ctx.host.regions_mut(), &plot.id, flags) {
                    Ok(p) => { plot = p; report.repaired += 1; },
                    Err(e) => error!("Could not set flag {} again: {}", key, e)
                }
            }

            let anchor = anchor_of(&plot, &self.timers.vertical);
            self.ctx.redraw(&plot, anchor);
            report.redrawn += 1;
        }
        self.ctx.placer.flush_records();

        info!("Resynchronized {} plot(s): {:?}", report.redrawn, report);
        report
    }


    // ---- status ----

    pub fn plot(&self, id: &str) -> Option<Plot> {
        self.ctx.plot(id).ok()
    }

    /// The stable id behind a player name, for commands which name the player.
    pub fn owner_named(&self, name: &str) -> Option<OwnerId> {
        self.ctx.host.identity().resolve(name)
    }

    pub fn plots_of(&self, owner: &OwnerId) -> Vec<Plot> {
        self.ctx.plots().into_iter().filter(|p| p.is_owned_by(owner)).collect()
    }

    pub fn level_of(&self, id: &str) -> Result<u32, Error> {
        let plot = self.ctx.plot(id)?;
        self.ctx.level_of(&plot)
    }

    pub fn remaining_lifetime(&self, id: &str) -> Option<Duration> {
        self.timers.lifetime.remaining(&id.to_owned(), self.now())
    }

    pub fn remaining_vertical(&self, id: &str) -> Option<Duration> {
        self.timers.vertical.remaining(&id.to_owned(), self.now())
    }

    pub fn remaining_flag(&self, id: &str, flag: &str) -> Option<Duration> {
        self.timers.flags.remaining(&FlagKey::new(id, flag), self.now())
    }

    pub fn is_expansion_active(&self, id: &str) -> bool {
        self.timers.vertical.is_active(&id.to_owned())
    }

    pub fn has_outline(&self, id: &str) -> bool {
        self.ctx.placer.has_outline(id)
    }
}
