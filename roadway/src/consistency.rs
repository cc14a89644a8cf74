use std::collections::BTreeSet;

use anyhow::Result;

use crate::{LinkID, Network, NodeID, ShapeID, WranglerError};

/// Everything wrong with the references between tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConsistencyReport {
    /// A link's A or B isn't in the node table.
    pub missing_nodes: Vec<(LinkID, NodeID)>,
    pub missing_shapes: Vec<(LinkID, ShapeID)>,
    /// The link's reference ID is missing from its A node's outbound list or its B node's
    /// inbound list.
    pub missing_adjacency: Vec<(LinkID, NodeID)>,
    /// Table keys that don't match the record's own ID.
    pub mismatched_keys: Vec<String>,
    /// Shapes no link uses. Tolerated, but reported.
    pub orphan_shapes: Vec<ShapeID>,
}

impl ConsistencyReport {
    pub fn is_ok(&self) -> bool {
        self.missing_nodes.is_empty()
            && self.missing_shapes.is_empty()
            && self.missing_adjacency.is_empty()
            && self.mismatched_keys.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        if let Some((link, node)) = self.missing_nodes.first() {
            return Err(WranglerError::ForeignKeyValue(format!(
                "{} refers to {}, which doesn't exist ({} such problems)",
                link,
                node,
                self.missing_nodes.len()
            ))
            .into());
        }
        if let Some((link, shape)) = self.missing_shapes.first() {
            return Err(WranglerError::ForeignKeyValue(format!(
                "{} refers to {}, which doesn't exist ({} such problems)",
                link,
                shape,
                self.missing_shapes.len()
            ))
            .into());
        }
        if let Some((link, node)) = self.missing_adjacency.first() {
            return Err(WranglerError::ForeignKeyValue(format!(
                "{} doesn't list the reference ID of {}",
                node, link
            ))
            .into());
        }
        if let Some(x) = self.mismatched_keys.first() {
            return Err(WranglerError::Uniqueness(x.clone()).into());
        }
        Ok(())
    }
}

impl Network {
    pub fn check_consistency(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();
        for (id, n) in &self.nodes {
            if *id != n.id {
                report
                    .mismatched_keys
                    .push(format!("{} is stored under {}", n.id, id));
            }
        }
        for (id, s) in &self.shapes {
            if *id != s.id {
                report
                    .mismatched_keys
                    .push(format!("{} is stored under {}", s.id, id));
            }
        }
        for (id, l) in &self.links {
            if *id != l.id {
                report
                    .mismatched_keys
                    .push(format!("{} is stored under {}", l.id, id));
            }
            match self.nodes.get(&l.a) {
                Some(n) => {
                    if !l.reference_id.is_empty()
                        && !n.outbound_reference_ids.contains(&l.reference_id)
                    {
                        report.missing_adjacency.push((l.id, l.a));
                    }
                }
                None => report.missing_nodes.push((l.id, l.a)),
            }
            match self.nodes.get(&l.b) {
                Some(n) => {
                    if !l.reference_id.is_empty()
                        && !n.inbound_reference_ids.contains(&l.reference_id)
                    {
                        report.missing_adjacency.push((l.id, l.b));
                    }
                }
                None => report.missing_nodes.push((l.id, l.b)),
            }
            if let Some(ref s) = l.shape_id {
                if !self.shapes.contains_key(s) {
                    report.missing_shapes.push((l.id, s.clone()));
                }
            }
        }
        let used: BTreeSet<&ShapeID> = self.links.values().filter_map(|l| l.shape_id.as_ref()).collect();
        for id in self.shapes.keys() {
            if !used.contains(id) {
                report.orphan_shapes.push(id.clone());
            }
        }
        if !report.orphan_shapes.is_empty() {
            debug!("{} shapes aren't used by any link", report.orphan_shapes.len());
        }
        report
    }

    /// Fails with the first broken reference, if any.
    pub fn validate(&self) -> Result<()> {
        self.check_consistency().into_result()
    }
}
