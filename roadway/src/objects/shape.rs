use std::fmt;

use serde::{Deserialize, Serialize};

use geom::PolyLine;

use crate::Attributes;

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeID(pub String);

impl fmt::Display for ShapeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Shape {}", self.0)
    }
}

impl ShapeID {
    /// Deterministic ID for a generated geometry, hashed from its endpoints.
    pub fn from_geometry(pl: &PolyLine) -> ShapeID {
        let first = pl.first_pt();
        let last = pl.last_pt();
        let message = format!(
            "Geometry {} {} {} {}",
            first.x(),
            first.y(),
            last.x(),
            last.y()
        );
        ShapeID(format!("{:x}", md5::compute(message.as_bytes())))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "shape_id")]
    pub id: ShapeID,
    pub geometry: PolyLine,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Shape {
    pub fn new(geometry: PolyLine) -> Shape {
        Shape {
            id: ShapeID::from_geometry(&geometry),
            geometry,
            attributes: Attributes::new(),
        }
    }
}
