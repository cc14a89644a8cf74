//! Geographic primitives for transportation networks. Everything lives in WGS84 longitude and
//! latitude; lengths are great-circle distances.

mod angle;
mod distance;
mod gps;
mod polyline;

pub use crate::angle::Angle;
pub use crate::distance::Distance;
pub use crate::gps::LonLat;
pub use crate::polyline::PolyLine;

/// Some geometry operations need a threshold to treat two points as equal.
pub const EPSILON_DIST: Distance = Distance::const_meters(0.01);
