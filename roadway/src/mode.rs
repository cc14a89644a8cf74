use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A way of travelling over the network. Each mode maps to the flag attributes that grant it
/// access to links and nodes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Drive,
    Bus,
    Rail,
    Transit,
    Walk,
    Bike,
}

impl Mode {
    pub fn all() -> Vec<Mode> {
        vec![
            Mode::Drive,
            Mode::Bus,
            Mode::Rail,
            Mode::Transit,
            Mode::Walk,
            Mode::Bike,
        ]
    }

    /// A link is usable by this mode if any of these attributes is truthy.
    pub fn link_variables(self) -> &'static [&'static str] {
        match self {
            Mode::Drive => &["drive_access"],
            Mode::Bus => &["bus_only", "drive_access"],
            Mode::Rail => &["rail_only"],
            Mode::Transit => &["bus_only", "rail_only", "drive_access"],
            Mode::Walk => &["walk_access"],
            Mode::Bike => &["bike_access"],
        }
    }

    pub fn node_variables(self) -> &'static [&'static str] {
        match self {
            Mode::Drive => &["drive_node"],
            Mode::Bus => &["bus_only", "drive_node"],
            Mode::Rail => &["rail_only"],
            Mode::Transit => &["bus_only", "rail_only", "drive_node"],
            Mode::Walk => &["walk_node"],
            Mode::Bike => &["bike_node"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Drive => "drive",
            Mode::Bus => "bus",
            Mode::Rail => "rail",
            Mode::Transit => "transit",
            Mode::Walk => "walk",
            Mode::Bike => "bike",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(x: &str) -> Result<Mode> {
        for mode in Mode::all() {
            if mode.as_str() == x.to_lowercase() {
                return Ok(mode);
            }
        }
        bail!("unknown mode {}", x)
    }
}
