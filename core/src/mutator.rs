use error::MutationError;
use host::RegionStore;
use primitives::{BoundingBox, Plot};
use std::collections::BTreeMap;

/// Changes plot bounds and flags on a region authority which only knows how to add and remove.
///
/// Every change is the same sequence: remember the current plot as the contra (what undoing the
/// change puts back), remove it, add the replacement, save. If the add fails the contra is added
/// back. Only when that also fails is the plot lost, which is reported as `Unrecoverable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicRegionMutator;

impl AtomicRegionMutator {
    pub fn new() -> AtomicRegionMutator {
        AtomicRegionMutator
    }

    /// Replace the bounds of a plot, keeping owner, members, flags and priority.
    pub fn commit(&self, regions: &mut dyn RegionStore, id: &str, bounds: BoundingBox) -> Result<Plot, MutationError> {
        self.replace(regions, id, |p| p.with_bounds(bounds))
    }

    /// Replace only the vertical range of a plot. X and Z are copied from the stored plot, never
    /// recomputed, so a vertical change cannot disturb the horizontal level.
    pub fn commit_vertical(&self, regions: &mut dyn RegionStore, id: &str, min_y: i32, max_y: i32) -> Result<Plot, MutationError> {
        self.replace(regions, id, |p| p.with_bounds(p.bounds.with_y_range(min_y, max_y)))
    }

    /// Replace the flag map of a plot, keeping its bounds.
    pub fn commit_flags(&self, regions: &mut dyn RegionStore, id: &str, flags: BTreeMap<String, String>) -> Result<Plot, MutationError> {
        self.replace(regions, id, |p| p.with_flags(flags))
    }

    fn replace<F>(&self, regions: &mut dyn RegionStore, id: &str, change: F) -> Result<Plot, MutationError>
        where F: FnOnce(&Plot) -> Plot
    {
        let contra = match regions.region(id) {
            Some(p) => p,
            None => return Err(MutationError::Stale(id.to_owned()))
        };
        let replacement = change(&contra);

        match regions.remove_region(id) {
            Ok(Some(_)) => (),
            Ok(None) => return Err(MutationError::Stale(id.to_owned())),
            Err(e) => return Err(MutationError::Rejected { id: id.to_owned(), reason: e.to_string() })
        }

        if let Err(e) = regions.add_region(replacement.clone()) {
            let reason = e.to_string();
            return match regions.add_region(contra) {
                Ok(()) => {
                    warn!("Change to plot {} was rolled back: {}", id, reason);
                    save(regions, id);
                    Err(MutationError::RolledBack { id: id.to_owned(), reason })
                },
                Err(undo) => {
                    error!("Plot {} was removed but neither its replacement ({}) nor the original ({}) \
                            could be added back. Manual intervention required.", id, reason, undo);
                    Err(MutationError::Unrecoverable {
                        id: id.to_owned(),
                        reason: format!("{}; restoring the original failed: {}", reason, undo)
                    })
                }
            }
        }

        save(regions, id);
        debug!("Plot {} now spans {}", id, replacement.bounds);
        Ok(replacement)
    }
}

/// Saving is best-effort: the authority already holds the change in memory.
fn save(regions: &mut dyn RegionStore, id: &str) {
    if let Err(e) = regions.save() {
        error!("Could not save region authority after changing plot {}: {}", id, e);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use host::MemoryRegions;
    use primitives::Coord;

    fn seeded() -> (MemoryRegions, Plot) {
        let mut regions = MemoryRegions::new();
        let mut plot = Plot::new("alice_1".into(), "world", "alice".into(),
            BoundingBox::around(Coord(100, 64, 100), 3, 3, 3), 7);
        plot.members.insert("bob".into());
        plot.flags.insert("pvp".into(), "deny".into());
        regions.insert(plot.clone());
        (regions, plot)
    }

    #[test]
    fn commit_keeps_everything_but_bounds() {
        let (mut regions, plot) = seeded();
        let bounds = BoundingBox::around(Coord(100, 64, 100), 5, 5, 5);
        let out = AtomicRegionMutator::new().commit(&mut regions, "alice_1", bounds).unwrap();
        assert_eq!(out.bounds, bounds);
        assert_eq!(out.members, plot.members);
        assert_eq!(out.flags, plot.flags);
        assert_eq!(out.priority, 7);
        assert_eq!(regions.region("alice_1"), Some(out));
        assert_eq!(regions.saves, 1);
    }

    #[test]
    fn failed_add_rolls_back() {
        let (mut regions, plot) = seeded();
        regions.failing_adds = 1;
        let bounds = BoundingBox::around(Coord(100, 64, 100), 5, 5, 5);
        match AtomicRegionMutator::new().commit(&mut regions, "alice_1", bounds) {
            Err(MutationError::RolledBack { ref id, .. }) => assert_eq!(id, "alice_1"),
            other => panic!("expected a rollback, got {:?}", other)
        }
        assert_eq!(regions.region("alice_1"), Some(plot));
    }

    #[test]
    fn failed_compensation_is_unrecoverable() {
        let (mut regions, _) = seeded();
        regions.failing_adds = 2;
        let bounds = BoundingBox::around(Coord(100, 64, 100), 5, 5, 5);
        match AtomicRegionMutator::new().commit(&mut regions, "alice_1", bounds) {
            Err(MutationError::Unrecoverable { .. }) => (),
            other => panic!("expected unrecoverable, got {:?}", other)
        }
        assert_eq!(regions.region("alice_1"), None);
    }

    #[test]
    fn refused_remove_changes_nothing() {
        let (mut regions, plot) = seeded();
        regions.failing_removes = true;
        let res = AtomicRegionMutator::new().commit_vertical(&mut regions, "alice_1", -64, 319);
        assert!(match res { Err(MutationError::Rejected { .. }) => true, _ => false });
        assert_eq!(regions.region("alice_1"), Some(plot));
    }

    #[test]
    fn vertical_commit_leaves_footprint_identical() {
        let (mut regions, plot) = seeded();
        let out = AtomicRegionMutator::new().commit_vertical(&mut regions, "alice_1", -64, 319).unwrap();
        assert_eq!((out.bounds.min().y(), out.bounds.max().y()), (-64, 319));
        assert_eq!((out.bounds.min().x(), out.bounds.min().z()), (plot.bounds.min().x(), plot.bounds.min().z()));
        assert_eq!((out.bounds.max().x(), out.bounds.max().z()), (plot.bounds.max().x(), plot.bounds.max().z()));
    }

    #[test]
    fn missing_plot_is_stale() {
        let mut regions = MemoryRegions::new();
        let res = AtomicRegionMutator::new().commit_flags(&mut regions, "ghost", BTreeMap::new());
        assert_eq!(res, Err(MutationError::Stale("ghost".into())));
    }
}
