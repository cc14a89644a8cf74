use std::fmt;

use serde::{Deserialize, Serialize};

/// A compass bearing, stored in degrees clockwise from north.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub fn degrees(degs: f64) -> Angle {
        Angle(degs)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle(self.0 + degrees)
    }

    /// In [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.0.rem_euclid(360.0)
    }

    pub fn normalized_radians(self) -> f64 {
        self.normalized_degrees().to_radians()
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}
