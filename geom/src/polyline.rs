use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{Distance, LonLat, EPSILON_DIST};

/// An ordered sequence of at least two points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LonLat>", into = "Vec<LonLat>")]
pub struct PolyLine {
    pts: Vec<LonLat>,
}

impl PolyLine {
    pub fn new(pts: Vec<LonLat>) -> Result<PolyLine> {
        if pts.len() < 2 {
            bail!("Need at least two points for a PolyLine, got {}", pts.len());
        }
        Ok(PolyLine { pts })
    }

    /// Panics if the endpoints are missing. Only use with points built in code.
    pub fn must_new(pts: Vec<LonLat>) -> PolyLine {
        PolyLine::new(pts).unwrap()
    }

    pub fn points(&self) -> &Vec<LonLat> {
        &self.pts
    }

    pub fn first_pt(&self) -> LonLat {
        self.pts[0]
    }

    pub fn last_pt(&self) -> LonLat {
        *self.pts.last().unwrap()
    }

    /// Great-circle length along all segments.
    pub fn length(&self) -> Distance {
        self.pts
            .windows(2)
            .map(|pair| pair[0].gps_dist(pair[1]))
            .sum()
    }

    /// True if the line doesn't go anywhere.
    pub fn is_degenerate(&self) -> bool {
        self.length() < EPSILON_DIST
    }

    /// Shift every point perpendicular to the direction of travel. Positive distances move to the
    /// right of the line, negative to the left. Each point uses the bearing of the segment
    /// starting there; the last point reuses the final segment's bearing.
    pub fn shift_perpendicular(&self, dist: Distance) -> PolyLine {
        let mut pts = Vec::with_capacity(self.pts.len());
        for idx in 0..self.pts.len() {
            let (from, to) = if idx + 1 < self.pts.len() {
                (self.pts[idx], self.pts[idx + 1])
            } else {
                (self.pts[idx - 1], self.pts[idx])
            };
            let bearing = from.bearing_to(to).rotate_degs(90.0);
            pts.push(self.pts[idx].project_away(dist, bearing));
        }
        PolyLine { pts }
    }

    pub fn reversed(&self) -> PolyLine {
        let mut pts = self.pts.clone();
        pts.reverse();
        PolyLine { pts }
    }
}

impl TryFrom<Vec<LonLat>> for PolyLine {
    type Error = anyhow::Error;

    fn try_from(pts: Vec<LonLat>) -> Result<PolyLine> {
        PolyLine::new(pts)
    }
}

impl From<PolyLine> for Vec<LonLat> {
    fn from(pl: PolyLine) -> Vec<LonLat> {
        pl.pts
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  LonLat::new({}, {}),", pt.longitude, pt.latitude)?;
        }
        write!(f, "])")
    }
}
