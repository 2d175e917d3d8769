use error::ValidationError;
use primitives::{BoundingBox, OwnerId, Plot, PlotId};

/// Decides whether a candidate volume may be claimed. Pure predicates over the current plot list;
/// the cost is linear in the number of plots, which is fine at the hundreds-of-plots scale a world
/// holds.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    max_plots_per_owner: usize,
}

impl CollisionResolver {
    pub fn new(max_plots_per_owner: usize) -> CollisionResolver {
        CollisionResolver { max_plots_per_owner }
    }

    /// True if `candidate` overlaps no plot belonging to someone other than `owner`. Plots of the
    /// same owner never conflict, so re-expanding a plot does not collide with itself.
    pub fn can_place(&self, candidate: BoundingBox, owner: &OwnerId, plots: &[Plot]) -> bool {
        !plots.iter().any(|p| Self::conflicts_with(candidate, owner, p))
    }

    /// Ids of every plot `candidate` would illegally overlap. Empty iff `can_place` holds.
    pub fn conflicts(&self, candidate: BoundingBox, owner: &OwnerId, plots: &[Plot]) -> Vec<PlotId> {
        plots.iter()
            .filter(|p| Self::conflicts_with(candidate, owner, p))
            .map(|p| p.id.clone())
            .collect()
    }

    /// True if `owner` may hold one more plot.
    pub fn within_cap(&self, owner: &OwnerId, plots: &[Plot]) -> bool {
        plots.iter().filter(|p| p.is_owned_by(owner)).count() < self.max_plots_per_owner
    }

    /// Geometry check with the conflicting plots attached to the error.
    pub fn check_placement(&self, candidate: BoundingBox, owner: &OwnerId, plots: &[Plot]) -> Result<(), ValidationError> {
        let conflicts = self.conflicts(candidate, owner, plots);
        if conflicts.is_empty() { Ok(()) }
        else { Err(ValidationError::Collision { conflicts }) }
    }

    /// Everything a brand new claim has to pass: the owner's cap, then geometry.
    pub fn check_new_claim(&self, candidate: BoundingBox, owner: &OwnerId, plots: &[Plot]) -> Result<(), ValidationError> {
        if !self.within_cap(owner, plots) {
            return Err(ValidationError::CapExceeded { limit: self.max_plots_per_owner })
        }
        self.check_placement(candidate, owner, plots)
    }

    #[inline]
    fn conflicts_with(candidate: BoundingBox, owner: &OwnerId, plot: &Plot) -> bool {
        !plot.is_owned_by(owner) && candidate.intersects(plot.bounds)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use primitives::Coord;

    fn plot(id: &str, owner: &str, lo: (i32, i32, i32), hi: (i32, i32, i32)) -> Plot {
        Plot::new(id.into(), "world", owner.into(),
            BoundingBox::new(Coord(lo.0, lo.1, lo.2), Coord(hi.0, hi.1, hi.2)), 0)
    }

    #[test]
    fn own_plots_never_conflict() {
        let resolver = CollisionResolver::new(3);
        let plots = vec![plot("alice_1", "alice", (0, 0, 0), (4, 4, 4))];
        let grown = BoundingBox::new(Coord(-1, -1, -1), Coord(5, 5, 5));
        assert!(resolver.can_place(grown, &"alice".into(), &plots));
        assert!(!resolver.can_place(grown, &"bob".into(), &plots));
    }

    #[test]
    fn lists_every_conflict() {
        let resolver = CollisionResolver::new(3);
        let plots = vec![
            plot("bob_1", "bob", (0, 0, 0), (4, 4, 4)),
            plot("carol_1", "carol", (10, 0, 0), (14, 4, 4)),
            plot("alice_1", "alice", (5, 0, 0), (9, 4, 4)),
            plot("dave_1", "dave", (100, 0, 100), (104, 4, 104)),
        ];
        let candidate = BoundingBox::new(Coord(3, 0, 0), Coord(11, 4, 4));
        assert_eq!(resolver.conflicts(candidate, &"alice".into(), &plots),
            vec!["bob_1".to_owned(), "carol_1".to_owned()]);
        assert_eq!(resolver.check_placement(candidate, &"alice".into(), &plots),
            Err(ValidationError::Collision { conflicts: vec!["bob_1".into(), "carol_1".into()] }));
    }

    #[test]
    fn accepted_candidates_never_intersect_foreign_plots() {
        let resolver = CollisionResolver::new(10);
        let plots = vec![
            plot("bob_1", "bob", (0, 60, 0), (4, 64, 4)),
            plot("bob_2", "bob", (-20, 0, 7), (-16, 10, 11)),
            plot("alice_1", "alice", (20, 60, 20), (24, 64, 24)),
        ];
        let owner: OwnerId = "alice".into();
        for x in -25..25 {
            for z in -5..15 {
                let candidate = BoundingBox::around(Coord(x, 62, z), 5, 5, 5);
                if resolver.can_place(candidate, &owner, &plots) {
                    for p in plots.iter().filter(|p| !p.is_owned_by(&owner)) {
                        assert!(!candidate.intersects(p.bounds), "{} overlaps {}", candidate, p.id);
                    }
                }
            }
        }
    }

    #[test]
    fn cap_is_independent_of_geometry() {
        let resolver = CollisionResolver::new(2);
        let plots = vec![
            plot("alice_1", "alice", (0, 0, 0), (2, 2, 2)),
            plot("alice_2", "alice", (10, 0, 0), (12, 2, 2)),
        ];
        let far = BoundingBox::new(Coord(500, 0, 500), Coord(502, 2, 502));
        assert_eq!(resolver.check_new_claim(far, &"alice".into(), &plots),
            Err(ValidationError::CapExceeded { limit: 2 }));
        assert!(resolver.check_new_claim(far, &"bob".into(), &plots).is_ok());
    }
}
