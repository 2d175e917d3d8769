pub mod coord;
pub mod material;
pub mod plot;

pub use self::coord::*;
pub use self::material::*;
pub use self::plot::*;

/// Amounts of currency in the economy's smallest unit.
pub type Money = u64;
