use config::{OutlineConfig, PlacementStrategy};
use host::VoxelGrid;
use primitives::{BoundingBox, Coord, Material, MaterialRules, Plot, PlotId};
use super::record::{OutlineRecord, OutlineStore};

/// Keeps a line of marker voxels around the footprint of every plot, resting on terrain where it
/// can. Each plot is either without an outline or has exactly one record of what its markers
/// replaced; there is no incremental update, a changed plot is removed and placed again.
pub struct GroundSearchBorderPlacer {
    config: OutlineConfig,
    rules: MaterialRules,
    records: OutlineStore,
}

impl GroundSearchBorderPlacer {
    pub fn new(config: OutlineConfig, rules: MaterialRules, records: OutlineStore) -> GroundSearchBorderPlacer {
        GroundSearchBorderPlacer { config, rules, records }
    }

    pub fn marker(&self) -> &Material {
        &self.config.marker
    }

    pub fn has_outline(&self, plot: &str) -> bool {
        self.records.contains(plot)
    }

    pub fn record(&self, plot: &str) -> Option<&OutlineRecord> {
        self.records.get(plot)
    }

    /// Plots which currently have an outline.
    pub fn outlined(&self) -> Vec<PlotId> {
        self.records.plots()
    }

    /// Defer persisting outline records until `flush_records`.
    pub fn hold_records(&mut self) {
        self.records.hold();
    }

    pub fn flush_records(&mut self) {
        self.records.flush();
    }

    /// Place the outline of `plot`, searching for ground around `anchor_y`. An outline the plot
    /// already has is removed first, so calling this again after a bounds change re-places it.
    pub fn place(&mut self, grid: &mut dyn VoxelGrid, plot: &Plot, anchor_y: i32) -> OutlineRecord {
        if self.records.contains(&plot.id) {
            self.remove(grid, &plot.id);
        }

        let mut record = OutlineRecord::new(plot.id.clone());
        let mut skipped = 0;
        for (x, z) in edge_columns(plot.bounds) {
            let y = match self.marker_height(&*grid, x, z, anchor_y) {
                Some(y) => y,
                None => { skipped += 1; continue }
            };
            let at = Coord(x, y, z);
            if record.replaced.contains_key(&at) { continue; }

            record.replaced.insert(at, grid.voxel(at));
            grid.set_voxel(at, self.config.marker.clone());
        }

        if skipped > 0 {
            debug!("No marker position in {} column(s) around plot {}", skipped, plot.id);
        }
        debug!("Placed {} marker(s) around plot {}", record.len(), plot.id);
        self.records.insert(record.clone());
        record
    }

    /// Remove the outline of a plot, putting back what each marker replaced. A voxel which no
    /// longer holds the marker has been changed by someone else and is left alone. Returns the
    /// number of voxels restored.
    pub fn remove(&mut self, grid: &mut dyn VoxelGrid, plot: &str) -> usize {
        let record = match self.records.take(plot) {
            Some(r) => r,
            None => return 0
        };

        let mut restored = 0;
        for (at, original) in record.replaced {
            if grid.voxel(at) == self.config.marker {
                grid.set_voxel(at, original);
                restored += 1;
            } else {
                warn!("Outline voxel {} of plot {} no longer holds the marker; left untouched", at, plot);
            }
        }
        debug!("Removed outline of plot {}, restored {} voxel(s)", plot, restored);
        restored
    }

    /// Y at which the marker for column (x, z) goes, or `None` when the column has no usable
    /// position.
    pub fn marker_height(&self, grid: &dyn VoxelGrid, x: i32, z: i32, anchor_y: i32) -> Option<i32> {
        match self.config.strategy {
            PlacementStrategy::SurfaceContact => self.surface_contact(grid, x, z, anchor_y),
            PlacementStrategy::VisibilityBiased =>
                self.search(grid, x, z, anchor_y, |at| self.is_grounded(grid, at) && self.is_visible(grid, at))
                    .or_else(|| self.surface_contact(grid, x, z, anchor_y)),
            PlacementStrategy::FixedOffset => {
                let y = anchor_y - 1;
                if in_world(grid, y) && self.is_target(grid, Coord(x, y, z)) { Some(y) } else { None }
            }
        }
    }

    fn surface_contact(&self, grid: &dyn VoxelGrid, x: i32, z: i32, anchor_y: i32) -> Option<i32> {
        self.search(grid, x, z, anchor_y, |at| self.is_grounded(grid, at))
            .or_else(|| {
                let y = grid.highest_solid_y(x, z) + 1;
                if in_world(grid, y) && self.is_target(grid, Coord(x, y, z)) { Some(y) } else { None }
            })
    }

    /// Downward from just below the anchor, then upward from the anchor.
    fn search<F>(&self, grid: &dyn VoxelGrid, x: i32, z: i32, anchor_y: i32, accept: F) -> Option<i32>
        where F: Fn(Coord) -> bool
    {
        let floor = grid.min_height() + 1;
        let ceiling = grid.max_height();

        let start = anchor_y - 1;
        let down = ((start - self.config.search_down).max(floor)..=start.min(ceiling)).rev();
        let up = anchor_y.max(floor)..=(anchor_y + self.config.search_up).min(ceiling);

        down.chain(up).find(|&y| accept(Coord(x, y, z)))
    }

    /// A marker may replace the voxel: air, liquid or vegetation, and not already a marker.
    fn is_target(&self, grid: &dyn VoxelGrid, at: Coord) -> bool {
        let m = grid.voxel(at);
        m != self.config.marker && self.rules.classify(&m).is_target()
    }

    fn is_grounded(&self, grid: &dyn VoxelGrid, at: Coord) -> bool {
        self.is_target(grid, at) && self.rules.classify(&grid.voxel(at.below())).is_ground()
    }

    fn is_visible(&self, grid: &dyn VoxelGrid, at: Coord) -> bool {
        at.y() >= grid.max_height() || self.rules.classify(&grid.voxel(at.above())).is_see_through()
    }
}

#[inline]
fn in_world(grid: &dyn VoxelGrid, y: i32) -> bool {
    y >= grid.min_height() && y <= grid.max_height()
}

/// Every (x, z) on the rim of the footprint, once each. North and south rows span the full
/// width; east and west columns leave out the corners the rows already hold.
pub fn edge_columns(bounds: BoundingBox) -> Vec<(i32, i32)> {
    let (lo, hi) = (bounds.min(), bounds.max());
    let mut columns = Vec::new();
    for x in lo.x()..=hi.x() {
        columns.push((x, lo.z()));
        if hi.z() != lo.z() { columns.push((x, hi.z())); }
    }
    for z in (lo.z() + 1)..hi.z() {
        columns.push((lo.x(), z));
        if hi.x() != lo.x() { columns.push((hi.x(), z)); }
    }
    columns
}
