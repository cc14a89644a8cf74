use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde_json::{Map, Value};

use geom::PolyLine;

use crate::objects::attributes::values_equal;
use crate::{Link, LinkID, Network, Node, NodeID, Shape, WranglerError};

impl Network {
    /// Adds nodes, then links between existing or just-added nodes. New links are drawn as
    /// straight lines between their nodes and get a shape derived from that geometry. Everything
    /// is checked before anything is added.
    pub fn add_new_roadway_feature_change(
        &mut self,
        links: &[Map<String, Value>],
        nodes: &[Map<String, Value>],
    ) -> Result<()> {
        let mut new_nodes = Vec::new();
        for raw in nodes {
            if !raw.contains_key("model_node_id") {
                return Err(card_error("a new node has no model_node_id"));
            }
            let node: Node = serde_json::from_value(Value::Object(raw.clone()))
                .map_err(|err| card_error(format!("bad new node: {}", err)))?;
            if self.nodes.contains_key(&node.id) || new_nodes.iter().any(|n: &Node| n.id == node.id)
            {
                return Err(
                    WranglerError::Uniqueness(format!("{} already exists", node.id)).into(),
                );
            }
            new_nodes.push(node);
        }

        let mut new_links = Vec::new();
        let mut new_endpoints = BTreeSet::new();
        for raw in links {
            for key in ["A", "B", "model_link_id"] {
                if !raw.contains_key(key) {
                    return Err(card_error(format!("a new link has no {}", key)));
                }
            }
            let mut link: Link = serde_json::from_value(Value::Object(raw.clone()))
                .map_err(|err| card_error(format!("bad new link: {}", err)))?;
            if self.links.contains_key(&link.id) || new_links.iter().any(|l: &Link| l.id == link.id)
            {
                return Err(
                    WranglerError::Uniqueness(format!("{} already exists", link.id)).into(),
                );
            }
            if self.find_link(link.a, link.b).is_some() || !new_endpoints.insert(link.endpoints())
            {
                return Err(WranglerError::Uniqueness(format!(
                    "a link from {} to {} already exists",
                    link.a, link.b
                ))
                .into());
            }
            let mut pts = Vec::new();
            for n in [link.a, link.b] {
                match self
                    .nodes
                    .get(&n)
                    .or_else(|| new_nodes.iter().find(|x| x.id == n))
                {
                    Some(node) => pts.push(node.pt()),
                    None => {
                        return Err(WranglerError::ForeignKeyValue(format!(
                            "new {} uses {}, which doesn't exist",
                            link.id, n
                        ))
                        .into())
                    }
                }
            }
            if link.reference_id.is_empty() {
                link.reference_id = Link::synthetic_reference_id(link.id);
            }
            if link.location_references.len() < 2 {
                link.set_geometry(&PolyLine::new(pts)?);
            }
            new_links.push(link);
        }

        let (num_nodes, num_links) = (new_nodes.len(), new_links.len());
        for node in new_nodes {
            self.add_node(node)?;
        }
        for mut link in new_links {
            let shape = Shape::new(link.geometry()?);
            link.shape_id = Some(shape.id.clone());
            self.add_shape(shape);
            self.add_link(link)?;
        }
        info!("Added {} nodes and {} links", num_nodes, num_links);
        Ok(())
    }

    /// Deletes links and nodes whose attribute equals one of the listed values. Shapes left
    /// without a link go too. Values matching nothing are warned about, or fail the change if
    /// `ignore_missing` is false.
    pub fn delete_roadway_feature_change(
        &mut self,
        links: &BTreeMap<String, Vec<Value>>,
        nodes: &BTreeMap<String, Vec<Value>>,
        ignore_missing: bool,
    ) -> Result<()> {
        let mut missing = Vec::new();

        let mut delete_links = BTreeSet::new();
        for (attribute, values) in links {
            for value in values {
                let matches: Vec<LinkID> = self
                    .links
                    .values()
                    .filter(|l| {
                        l.get(attribute)
                            .map(|x| values_equal(&x, value))
                            .unwrap_or(false)
                    })
                    .map(|l| l.id)
                    .collect();
                if matches.is_empty() {
                    missing.push(format!("no link has {} = {}", attribute, value));
                }
                delete_links.extend(matches);
            }
        }

        let mut delete_nodes = BTreeSet::new();
        for (attribute, values) in nodes {
            for value in values {
                let matches: Vec<NodeID> = self.find_node_by(attribute, value);
                if matches.is_empty() {
                    missing.push(format!("no node has {} = {}", attribute, value));
                }
                delete_nodes.extend(matches);
            }
        }

        if !missing.is_empty() {
            if ignore_missing {
                for msg in &missing {
                    warn!("Nothing to delete: {}", msg);
                }
            } else {
                return Err(card_error(missing.join("; ")));
            }
        }

        for l in &delete_links {
            self.delete_link(*l)?;
        }
        for n in &delete_nodes {
            self.delete_node(*n)?;
        }
        info!(
            "Deleted {} links and {} nodes",
            delete_links.len(),
            delete_nodes.len()
        );
        Ok(())
    }
}

fn card_error<S: Into<String>>(msg: S) -> anyhow::Error {
    WranglerError::InvalidProjectCard(msg.into()).into()
}
