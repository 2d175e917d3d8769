use std::cmp::{min, max};
use std::fmt;

/// A signed (x, y, z) voxel coordinate. `y` is the vertical axis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord(pub i32, pub i32, pub i32);

impl Coord {
    #[inline]
    pub fn x(self) -> i32 { self.0 }

    #[inline]
    pub fn y(self) -> i32 { self.1 }

    #[inline]
    pub fn z(self) -> i32 { self.2 }

    /// The same column at a different height.
    #[inline]
    pub fn with_y(self, y: i32) -> Coord {
        Coord(self.0, y, self.2)
    }

    /// The voxel directly beneath this one.
    #[inline]
    pub fn below(self) -> Coord {
        Coord(self.0, self.1 - 1, self.2)
    }

    /// The voxel directly above this one.
    #[inline]
    pub fn above(self) -> Coord {
        Coord(self.0, self.1 + 1, self.2)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}


/// A volume defined by two coordinates. The first coordinate is the (min x, min y, min z) corner
/// and the second is the (max x, max y, max z) corner. All functions treat the box as inclusive,
/// that is to say, the borders are considered within the box, so a box whose corners are equal
/// still holds exactly one voxel.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BoundingBox(Coord, Coord);

impl BoundingBox {
    /// Construct a bounding box from two points. This only requires that the points are opposite
    /// corners of the defined volume.
    pub fn new(a: Coord, b: Coord) -> BoundingBox {
        BoundingBox(
            Coord(min(a.0, b.0), min(a.1, b.1), min(a.2, b.2)),
            Coord(max(a.0, b.0), max(a.1, b.1), max(a.2, b.2))
        )
    }

    /// Construct a box of the given extents whose center voxel is `center`. Extents are expected
    /// to be odd; an even extent is rounded down to the next odd value.
    pub fn around(center: Coord, width: i32, height: i32, depth: i32) -> BoundingBox {
        let (hw, hh, hd) = (width / 2, height / 2, depth / 2);
        BoundingBox(
            Coord(center.0 - hw, center.1 - hh, center.2 - hd),
            Coord(center.0 + hw, center.1 + hh, center.2 + hd)
        )
    }

    #[inline]
    pub fn min(self) -> Coord { self.0 }

    #[inline]
    pub fn max(self) -> Coord { self.1 }

    /// Number of voxels along x.
    pub fn width(self) -> i32 {
        (self.1).0 - (self.0).0 + 1
    }

    /// Number of voxels along y.
    pub fn height(self) -> i32 {
        (self.1).1 - (self.0).1 + 1
    }

    /// Number of voxels along z.
    pub fn depth(self) -> i32 {
        (self.1).2 - (self.0).2 + 1
    }

    pub fn volume(self) -> u64 {
        self.width() as u64 * self.height() as u64 * self.depth() as u64
    }

    /// Integer midpoint per axis (floor division). Exact when the extent is odd.
    pub fn center(self) -> Coord {
        Coord(
            mid((self.0).0, (self.1).0),
            mid((self.0).1, (self.1).1),
            mid((self.0).2, (self.1).2)
        )
    }

    /// True if both horizontal extents are odd, i.e. the footprint has a unique center column.
    pub fn has_center_column(self) -> bool {
        self.width() % 2 == 1 && self.depth() % 2 == 1
    }

    /// The same box with its vertical range replaced. X and Z are copied untouched.
    pub fn with_y_range(self, min_y: i32, max_y: i32) -> BoundingBox {
        BoundingBox(
            Coord((self.0).0, min(min_y, max_y), (self.0).2),
            Coord((self.1).0, max(min_y, max_y), (self.1).2)
        )
    }

    /// Checks if the point is within this box.
    pub fn contains(self, point: Coord) -> bool {
        point.0 >= (self.0).0 && point.0 <= (self.1).0 &&
        point.1 >= (self.0).1 && point.1 <= (self.1).1 &&
        point.2 >= (self.0).2 && point.2 <= (self.1).2
    }

    /// Checks if the other box is completely within this box.
    pub fn contains_box(self, other: BoundingBox) -> bool {
        self.contains(other.0) &&
        self.contains(other.1)
    }

    /// Closed-interval AABB test: the boxes share at least one voxel iff they overlap on all three
    /// axes.
    pub fn intersects(self, other: BoundingBox) -> bool {
        !((self.1).0 < (other.0).0 || (self.0).0 > (other.1).0) &&
        !((self.1).1 < (other.0).1 || (self.0).1 > (other.1).1) &&
        !((self.1).2 < (other.0).2 || (self.0).2 > (other.1).2)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

#[inline]
fn mid(a: i32, b: i32) -> i32 {
    // floor division so negative coordinates round the same way as positive ones
    let sum = a as i64 + b as i64;
    (if sum < 0 && sum % 2 != 0 { sum / 2 - 1 } else { sum / 2 }) as i32
}
