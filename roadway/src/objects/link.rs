use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use geom::{LonLat, PolyLine};

use crate::{Attributes, Mode, NodeID, ShapeID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkID(pub i64);

impl fmt::Display for LinkID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Link #{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationReference {
    pub sequence: usize,
    pub point: LonLat,
}

/// A directed connection between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "model_link_id")]
    pub id: LinkID,
    #[serde(rename = "A")]
    pub a: NodeID,
    #[serde(rename = "B")]
    pub b: NodeID,
    /// Ties this link to the adjacency lists on its nodes.
    #[serde(rename = "shstReferenceId", default)]
    pub reference_id: String,
    #[serde(rename = "locationReferences", default)]
    pub location_references: Vec<LocationReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<ShapeID>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Link {
    pub fn new(id: LinkID, a: NodeID, b: NodeID) -> Link {
        Link {
            id,
            a,
            b,
            reference_id: Link::synthetic_reference_id(id),
            location_references: Vec::new(),
            shape_id: None,
            attributes: Attributes::new(),
        }
    }

    /// Links created here don't come from a conflation source, so they get a reference ID
    /// derived from their own ID.
    pub fn synthetic_reference_id(id: LinkID) -> String {
        format!("wrangler-{}", id.0)
    }

    pub fn endpoints(&self) -> (NodeID, NodeID) {
        (self.a, self.b)
    }

    /// Fields stored outside the attribute map. Edits can't set them.
    pub fn is_structural(field: &str) -> bool {
        matches!(
            field,
            "model_link_id" | "A" | "B" | "shstReferenceId" | "locationReferences" | "shape_id"
        )
    }

    /// Looks up structural fields by their column name too, so selections can match on them.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "model_link_id" => Some(Value::from(self.id.0)),
            "A" => Some(Value::from(self.a.0)),
            "B" => Some(Value::from(self.b.0)),
            "shstReferenceId" => Some(Value::from(self.reference_id.clone())),
            "shape_id" => self.shape_id.as_ref().map(|s| Value::from(s.0.clone())),
            "locationReferences" => serde_json::to_value(&self.location_references).ok(),
            _ => self.attributes.get(field).cloned(),
        }
    }

    /// True if the field is present and not blank.
    pub fn has_field(&self, field: &str) -> bool {
        match field {
            "model_link_id" | "A" | "B" => true,
            "shstReferenceId" => !self.reference_id.is_empty(),
            "shape_id" => self.shape_id.is_some(),
            "locationReferences" => self.location_references.len() >= 2,
            _ => self.attributes.has(field),
        }
    }

    pub fn name(&self) -> &str {
        self.attributes.get_str("name").unwrap_or("")
    }

    pub fn roadway(&self) -> Option<&str> {
        self.attributes.get_str("roadway")
    }

    pub fn has_access(&self, mode: Mode) -> bool {
        self.attributes.is_any_truthy(mode.link_variables())
    }

    pub fn is_managed(&self) -> bool {
        self.attributes.is_truthy("managed")
    }

    /// The polyline described by the location references, in sequence order.
    pub fn geometry(&self) -> Result<PolyLine> {
        let mut refs = self.location_references.clone();
        refs.sort_by_key(|r| r.sequence);
        PolyLine::new(refs.into_iter().map(|r| r.point).collect())
    }

    pub fn set_geometry(&mut self, pl: &PolyLine) {
        self.location_references = pl
            .points()
            .iter()
            .enumerate()
            .map(|(idx, pt)| LocationReference {
                sequence: idx + 1,
                point: *pt,
            })
            .collect();
    }

    pub fn first_pt(&self) -> Option<LonLat> {
        self.location_references
            .iter()
            .min_by_key(|r| r.sequence)
            .map(|r| r.point)
    }

    pub fn last_pt(&self) -> Option<LonLat> {
        self.location_references
            .iter()
            .max_by_key(|r| r.sequence)
            .map(|r| r.point)
    }
}
