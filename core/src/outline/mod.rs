//! The physical outline of plots: marker voxels along the rim of each footprint and the record of
//! what they replaced.

mod placer;
mod record;

pub use self::placer::{edge_columns, GroundSearchBorderPlacer};
pub use self::record::{OutlineRecord, OutlineStore};
