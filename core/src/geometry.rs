//! Pure geometry of plots: how big a plot of a given level is and where its center sits.

use config::Config;
use primitives::{BoundingBox, Coord};
use std::fmt;

/// Ways a plot's stored bounds can disagree with what the level rules allow. These are never
/// guessed around silently; callers log them as data-integrity warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// No unique center column exists.
    EvenFootprint { width: i32, depth: i32 },
    /// Width and depth differ, so there is no single level.
    NotSquare { width: i32, depth: i32 },
    /// Smaller than a level 0 plot.
    BelowBase { width: i32 },
    AboveMaxLevel { level: u32 },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IntegrityIssue::EvenFootprint { width, depth } =>
                write!(f, "footprint {}x{} has no center column", width, depth),
            IntegrityIssue::NotSquare { width, depth } =>
                write!(f, "footprint {}x{} is not square", width, depth),
            IntegrityIssue::BelowBase { width } =>
                write!(f, "footprint width {} is smaller than the base size", width),
            IntegrityIssue::AboveMaxLevel { level } =>
                write!(f, "level {} is beyond the configured maximum", level),
        }
    }
}


/// Size rules for plots, derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub base_width: i32,
    pub base_height: i32,
    pub max_level: u32,
}

impl Geometry {
    pub fn new(base_width: i32, base_height: i32, max_level: u32) -> Geometry {
        Geometry { base_width, base_height, max_level }
    }

    pub fn from_config(config: &Config) -> Geometry {
        Self::new(config.base_width, config.base_height, config.max_level)
    }

    /// Width and depth of a plot at `level`.
    #[inline]
    pub fn width_for_level(&self, level: u32) -> i32 {
        self.base_width + 2 * level as i32
    }

    /// Height of a plot at `level` when no vertical expansion is active.
    #[inline]
    pub fn height_for_level(&self, level: u32) -> i32 {
        self.base_height + 2 * level as i32
    }

    /// A fresh level 0 plot centered on `center`.
    pub fn base_bounds(&self, center: Coord) -> BoundingBox {
        BoundingBox::around(center, self.base_width, self.base_height, self.base_width)
    }

    /// Derive the expansion level from the stored footprint.
    pub fn level_of(&self, bounds: BoundingBox) -> Result<u32, IntegrityIssue> {
        let (width, depth) = (bounds.width(), bounds.depth());
        if !bounds.has_center_column() {
            return Err(IntegrityIssue::EvenFootprint { width, depth })
        }
        if width != depth {
            return Err(IntegrityIssue::NotSquare { width, depth })
        }
        if width < self.base_width {
            return Err(IntegrityIssue::BelowBase { width })
        }
        let level = ((width - self.base_width) / 2) as u32;
        if level > self.max_level {
            return Err(IntegrityIssue::AboveMaxLevel { level })
        }
        Ok(level)
    }

    /// Y range of a plot at `level` whose center sits at `anchor_y`.
    pub fn vertical_for_level(&self, anchor_y: i32, level: u32) -> (i32, i32) {
        let half = self.height_for_level(level) / 2;
        (anchor_y - half, anchor_y + half)
    }

    /// Bounds of `current` grown (or shrunk) to `level`, symmetrically around its footprint center.
    /// With `pinned_y` the vertical range is taken as given instead of following the level, which
    /// is how an active vertical expansion keeps its world-height bounds.
    pub fn bounds_for_level(&self, current: BoundingBox, level: u32, pinned_y: Option<(i32, i32)>) -> BoundingBox {
        let center = current.center();
        let width = self.width_for_level(level);
        let grown = BoundingBox::around(center, width, self.height_for_level(level), width);
        match pinned_y {
            Some((min_y, max_y)) => grown.with_y_range(min_y, max_y),
            None => grown
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Geometry { Geometry::new(3, 3, 4) }

    #[test]
    fn base_plot_is_level_zero() {
        let g = small();
        let b = g.base_bounds(Coord(100, 64, 100));
        assert_eq!(b.min(), Coord(99, 63, 99));
        assert_eq!(b.max(), Coord(101, 65, 101));
        assert_eq!(g.level_of(b), Ok(0));
    }

    #[test]
    fn level_one_grows_by_two() {
        let g = small();
        let b = g.bounds_for_level(g.base_bounds(Coord(100, 64, 100)), 1, None);
        assert_eq!(b.min(), Coord(98, 62, 98));
        assert_eq!(b.max(), Coord(102, 66, 102));
        assert_eq!(b.width(), 5);
        assert_eq!(g.level_of(b), Ok(1));
    }

    #[test]
    fn pinned_vertical_is_kept() {
        let g = small();
        let base = g.base_bounds(Coord(0, 64, 0)).with_y_range(-64, 319);
        let b = g.bounds_for_level(base, 2, Some((-64, 319)));
        assert_eq!((b.min().y(), b.max().y()), (-64, 319));
        assert_eq!((b.min().x(), b.max().x()), (-3, 3));
    }

    #[test]
    fn integrity_issues() {
        let g = small();
        let even = BoundingBox::new(Coord(0, 0, 0), Coord(3, 2, 3));
        assert_eq!(g.level_of(even), Err(IntegrityIssue::EvenFootprint { width: 4, depth: 4 }));
        let oblong = BoundingBox::new(Coord(0, 0, 0), Coord(4, 2, 2));
        assert_eq!(g.level_of(oblong), Err(IntegrityIssue::NotSquare { width: 5, depth: 3 }));
        let tiny = BoundingBox::new(Coord(0, 0, 0), Coord(0, 0, 0));
        assert_eq!(g.level_of(tiny), Err(IntegrityIssue::BelowBase { width: 1 }));
        let huge = BoundingBox::around(Coord(0, 0, 0), 13, 3, 13);
        assert_eq!(g.level_of(huge), Err(IntegrityIssue::AboveMaxLevel { level: 5 }));
    }

    #[test]
    fn vertical_restore_follows_level() {
        let g = small();
        assert_eq!(g.vertical_for_level(64, 0), (63, 65));
        assert_eq!(g.vertical_for_level(64, 2), (61, 67));
    }
}
