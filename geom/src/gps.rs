use std::fmt;

use geo::{Bearing, HaversineDestination, HaversineDistance, Point};
use serde::{Deserialize, Serialize};

use crate::{Angle, Distance};

/// longitude is x, latitude is y. Serialized as `[lon, lat]`, the way network files store
/// points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat {
            longitude: lon,
            latitude: lat,
        }
    }

    pub fn x(self) -> f64 {
        self.longitude
    }

    pub fn y(self) -> f64 {
        self.latitude
    }

    fn to_geo(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Great-circle (haversine) distance.
    pub fn gps_dist(self, other: LonLat) -> Distance {
        Distance::meters(self.to_geo().haversine_distance(&other.to_geo()))
    }

    /// The initial compass bearing of the great circle from this point towards another.
    pub fn bearing_to(self, other: LonLat) -> Angle {
        Angle::degrees(self.to_geo().bearing(other.to_geo()))
    }

    /// Travel a distance along a compass bearing.
    pub fn project_away(self, dist: Distance, bearing: Angle) -> LonLat {
        let pt = self
            .to_geo()
            .haversine_destination(bearing.normalized_degrees(), dist.inner_meters());
        LonLat::new(pt.x(), pt.y())
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(pt: [f64; 2]) -> LonLat {
        LonLat::new(pt[0], pt[1])
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(pt: LonLat) -> [f64; 2] {
        [pt.longitude, pt.latitude]
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LonLat({0}, {1})", self.longitude, self.latitude)
    }
}
