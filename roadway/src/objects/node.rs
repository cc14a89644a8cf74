use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use geom::LonLat;

use crate::{Attributes, Mode};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub i64);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

/// A point where links meet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "model_node_id")]
    pub id: NodeID,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    /// Reference IDs of the links leaving this node. Breadth expansion during selection walks
    /// these, so they must stay in sync with the link table.
    #[serde(rename = "outboundReferenceIds", default)]
    pub outbound_reference_ids: Vec<String>,
    #[serde(rename = "inboundReferenceIds", default)]
    pub inbound_reference_ids: Vec<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Node {
    pub fn new(id: NodeID, pt: LonLat) -> Node {
        Node {
            id,
            x: pt.x(),
            y: pt.y(),
            outbound_reference_ids: Vec::new(),
            inbound_reference_ids: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn pt(&self) -> LonLat {
        LonLat::new(self.x, self.y)
    }

    /// Looks up structural fields by their column name too, so selections can match on them.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "model_node_id" => Some(Value::from(self.id.0)),
            "X" => Some(Value::from(self.x)),
            "Y" => Some(Value::from(self.y)),
            _ => self.attributes.get(field).cloned(),
        }
    }

    pub fn has_access(&self, mode: Mode) -> bool {
        self.attributes.is_any_truthy(mode.node_variables())
    }

    pub(crate) fn add_outbound(&mut self, reference_id: &str) {
        add_unique(&mut self.outbound_reference_ids, reference_id);
    }

    pub(crate) fn add_inbound(&mut self, reference_id: &str) {
        add_unique(&mut self.inbound_reference_ids, reference_id);
    }

    pub(crate) fn remove_outbound(&mut self, reference_id: &str) {
        self.outbound_reference_ids.retain(|x| x != reference_id);
    }

    pub(crate) fn remove_inbound(&mut self, reference_id: &str) {
        self.inbound_reference_ids.retain(|x| x != reference_id);
    }

    /// Every reference ID touching this node, in either direction.
    pub fn all_reference_ids(&self) -> impl Iterator<Item = &String> {
        self.outbound_reference_ids
            .iter()
            .chain(self.inbound_reference_ids.iter())
    }
}

fn add_unique(list: &mut Vec<String>, x: &str) {
    if !x.is_empty() && !list.iter().any(|y| y == x) {
        list.push(x.to_string());
    }
}
