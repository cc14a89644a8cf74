use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde_json::Value;

use geom::Distance;
use netutil::{Counter, MultiMap, Timer};

use crate::{
    Link, LinkID, Node, NodeID, SelectionCache, Shape, ShapeID, WranglerConfig, WranglerError,
};

/// A roadway network: nodes, directed links between them, and the shapes links are drawn with.
///
/// Besides the three tables, this keeps two indices derived from the links (reference ID and
/// endpoint pair) and a cache of past selections. Every structural mutation goes through the
/// methods here, which keep the indices and node adjacency lists in sync and drop the cache.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) nodes: BTreeMap<NodeID, Node>,
    pub(crate) links: BTreeMap<LinkID, Link>,
    pub(crate) shapes: BTreeMap<ShapeID, Shape>,

    // Derived from links
    links_by_reference: MultiMap<String, LinkID>,
    links_by_endpoints: BTreeMap<(NodeID, NodeID), LinkID>,

    pub(crate) selections: SelectionCache,
    pub(crate) config: WranglerConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceUnits {
    Miles,
    Meters,
}

impl Network {
    /// Builds a network from raw tables, checking primary keys, endpoint uniqueness, and every
    /// reference from links to nodes and shapes.
    pub fn new(
        nodes: Vec<Node>,
        links: Vec<Link>,
        shapes: Vec<Shape>,
        config: WranglerConfig,
    ) -> Result<Network> {
        config.validate()?;

        let mut node_ids = Counter::new();
        for n in &nodes {
            node_ids.inc(n.id);
        }
        let mut link_ids = Counter::new();
        let mut endpoints = Counter::new();
        for l in &links {
            link_ids.inc(l.id);
            endpoints.inc(l.endpoints());
        }
        let mut shape_ids = Counter::new();
        for s in &shapes {
            shape_ids.inc(s.id.clone());
        }
        if let Some(id) = node_ids.duplicates().first() {
            return Err(WranglerError::Uniqueness(format!("{} appears more than once", id)).into());
        }
        if let Some(id) = link_ids.duplicates().first() {
            return Err(WranglerError::Uniqueness(format!("{} appears more than once", id)).into());
        }
        if let Some((a, b)) = endpoints.duplicates().first() {
            return Err(WranglerError::Uniqueness(format!(
                "more than one link goes from {} to {}",
                a, b
            ))
            .into());
        }
        if let Some(id) = shape_ids.duplicates().first() {
            return Err(WranglerError::Uniqueness(format!("{} appears more than once", id)).into());
        }

        let mut net = Network {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            links: BTreeMap::new(),
            shapes: shapes.into_iter().map(|s| (s.id.clone(), s)).collect(),
            links_by_reference: MultiMap::new(),
            links_by_endpoints: BTreeMap::new(),
            selections: SelectionCache::new(),
            config,
        };
        for link in links {
            net.index_link(&link);
            net.links.insert(link.id, link);
        }
        net.check_consistency().into_result()?;
        info!(
            "Network has {} nodes, {} links, {} shapes",
            net.nodes.len(),
            net.links.len(),
            net.shapes.len()
        );
        Ok(net)
    }

    pub fn empty(config: WranglerConfig) -> Network {
        Network {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            shapes: BTreeMap::new(),
            links_by_reference: MultiMap::new(),
            links_by_endpoints: BTreeMap::new(),
            selections: SelectionCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &WranglerConfig {
        &self.config
    }

    pub fn selections(&self) -> &SelectionCache {
        &self.selections
    }

    pub fn all_nodes(&self) -> &BTreeMap<NodeID, Node> {
        &self.nodes
    }

    pub fn all_links(&self) -> &BTreeMap<LinkID, Link> {
        &self.links
    }

    pub fn all_shapes(&self) -> &BTreeMap<ShapeID, Shape> {
        &self.shapes
    }

    pub fn get_n(&self, id: NodeID) -> &Node {
        &self.nodes[&id]
    }

    pub fn get_l(&self, id: LinkID) -> &Link {
        &self.links[&id]
    }

    pub fn maybe_get_n(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn maybe_get_l(&self, id: LinkID) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn maybe_get_shape(&self, id: &ShapeID) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn find_link(&self, a: NodeID, b: NodeID) -> Option<LinkID> {
        self.links_by_endpoints.get(&(a, b)).cloned()
    }

    pub fn links_with_reference_id(&self, reference_id: &str) -> &BTreeSet<LinkID> {
        self.links_by_reference.get(reference_id.to_string())
    }

    /// Is this a column of the link table? Structural fields always exist; other attributes
    /// exist if at least one link carries them.
    pub fn link_attribute_exists(&self, attribute: &str) -> bool {
        matches!(
            attribute,
            "model_link_id" | "A" | "B" | "shstReferenceId" | "locationReferences" | "shape_id"
        ) || self
            .links
            .values()
            .any(|l| l.attributes.contains_key(attribute))
    }

    pub fn node_attribute_exists(&self, attribute: &str) -> bool {
        matches!(attribute, "model_node_id" | "X" | "Y")
            || self
                .nodes
                .values()
                .any(|n| n.attributes.contains_key(attribute))
    }

    /// Looks up a node by any of the configured unique node fields, given as `{field: value}`.
    pub fn find_node_by(&self, field: &str, value: &Value) -> Vec<NodeID> {
        self.nodes
            .values()
            .filter(|n| {
                n.get(field)
                    .map(|x| crate::objects::attributes::values_equal(&x, value))
                    .unwrap_or(false)
            })
            .map(|n| n.id)
            .collect()
    }

    fn index_link(&mut self, link: &Link) {
        self.links_by_reference
            .insert(link.reference_id.clone(), link.id);
        self.links_by_endpoints.insert(link.endpoints(), link.id);
        if let Some(n) = self.nodes.get_mut(&link.a) {
            n.add_outbound(&link.reference_id);
        }
        if let Some(n) = self.nodes.get_mut(&link.b) {
            n.add_inbound(&link.reference_id);
        }
    }

    fn unindex_link(&mut self, link: &Link) {
        self.links_by_reference
            .remove(link.reference_id.clone(), link.id);
        self.links_by_endpoints.remove(&link.endpoints());
        // Another link might share the reference ID and node
        let still_out = self
            .links_with_reference_id(&link.reference_id)
            .iter()
            .any(|l| self.links[l].a == link.a);
        let still_in = self
            .links_with_reference_id(&link.reference_id)
            .iter()
            .any(|l| self.links[l].b == link.b);
        if !still_out {
            if let Some(n) = self.nodes.get_mut(&link.a) {
                n.remove_outbound(&link.reference_id);
            }
        }
        if !still_in {
            if let Some(n) = self.nodes.get_mut(&link.b) {
                n.remove_inbound(&link.reference_id);
            }
        }
    }

    /// Adds a node. Its ID must be new.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(WranglerError::Uniqueness(format!("{} already exists", node.id)).into());
        }
        self.nodes.insert(node.id, node);
        self.selections.invalidate();
        Ok(())
    }

    /// Adds a link. Its ID and endpoint pair must be new, both endpoints must exist, and so must
    /// its shape, if it has one.
    pub fn add_link(&mut self, link: Link) -> Result<()> {
        if self.links.contains_key(&link.id) {
            return Err(WranglerError::Uniqueness(format!("{} already exists", link.id)).into());
        }
        if let Some(existing) = self.find_link(link.a, link.b) {
            return Err(WranglerError::Uniqueness(format!(
                "{} already goes from {} to {}",
                existing, link.a, link.b
            ))
            .into());
        }
        for n in [link.a, link.b] {
            if !self.nodes.contains_key(&n) {
                return Err(WranglerError::ForeignKeyValue(format!(
                    "{} refers to {}, which doesn't exist",
                    link.id, n
                ))
                .into());
            }
        }
        if let Some(ref s) = link.shape_id {
            if !self.shapes.contains_key(s) {
                return Err(WranglerError::ForeignKeyValue(format!(
                    "{} refers to {}, which doesn't exist",
                    link.id, s
                ))
                .into());
            }
        }
        self.index_link(&link);
        self.links.insert(link.id, link);
        self.selections.invalidate();
        Ok(())
    }

    /// Adds a shape. If one with the same ID already exists, the existing one wins.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.entry(shape.id.clone()).or_insert(shape);
    }

    /// Removes a link, and its shape if nothing else uses it.
    pub fn delete_link(&mut self, id: LinkID) -> Result<Link> {
        let link = match self.links.remove(&id) {
            Some(l) => l,
            None => bail!("can't delete {}; it doesn't exist", id),
        };
        self.unindex_link(&link);
        if let Some(ref s) = link.shape_id {
            if !self.links.values().any(|l| l.shape_id.as_ref() == Some(s)) {
                self.shapes.remove(s);
            }
        }
        self.selections.invalidate();
        Ok(link)
    }

    /// Removes a node. Fails if any link still uses it.
    pub fn delete_node(&mut self, id: NodeID) -> Result<Node> {
        if let Some(l) = self.links.values().find(|l| l.a == id || l.b == id) {
            return Err(WranglerError::ForeignKeyValue(format!(
                "can't delete {}; {} still uses it",
                id, l.id
            ))
            .into());
        }
        let node = match self.nodes.remove(&id) {
            Some(n) => n,
            None => bail!("can't delete {}; it doesn't exist", id),
        };
        self.selections.invalidate();
        Ok(node)
    }

    /// Changes one attribute of a link. Attribute edits don't change the graph, so the selection
    /// cache survives.
    pub fn set_link_attribute<V: Into<Value>>(&mut self, id: LinkID, attribute: &str, value: V) -> Result<()> {
        if Link::is_structural(attribute) {
            bail!("{} is structural; it can't be set as an attribute", attribute);
        }
        match self.links.get_mut(&id) {
            Some(l) => {
                l.attributes.insert(attribute, value);
                Ok(())
            }
            None => bail!("{} doesn't exist", id),
        }
    }

    /// Swaps in completely new tables at once. The new tables are checked before anything in
    /// `self` changes, so on error the network is untouched.
    pub(crate) fn replace_tables(
        &mut self,
        nodes: BTreeMap<NodeID, Node>,
        links: BTreeMap<LinkID, Link>,
        shapes: BTreeMap<ShapeID, Shape>,
    ) -> Result<()> {
        let mut replacement = Network {
            nodes,
            links: BTreeMap::new(),
            shapes,
            links_by_reference: MultiMap::new(),
            links_by_endpoints: BTreeMap::new(),
            selections: SelectionCache::new(),
            config: self.config.clone(),
        };
        for link in links.into_values() {
            if replacement.links_by_endpoints.contains_key(&link.endpoints()) {
                return Err(WranglerError::Uniqueness(format!(
                    "more than one link goes from {} to {}",
                    link.a, link.b
                ))
                .into());
            }
            replacement.index_link(&link);
            replacement.links.insert(link.id, link);
        }
        replacement.check_consistency().into_result()?;

        self.nodes = replacement.nodes;
        self.links = replacement.links;
        self.shapes = replacement.shapes;
        self.links_by_reference = replacement.links_by_reference;
        self.links_by_endpoints = replacement.links_by_endpoints;
        self.selections.invalidate();
        Ok(())
    }

    /// Fills in the `distance` attribute of links from their geometry. If `use_shapes` is set
    /// and the link has a shape, the shape's more detailed geometry is measured instead. Links
    /// that already have a distance are skipped unless `overwrite` is set. Returns how many links
    /// changed.
    pub fn update_distance(
        &mut self,
        units: DistanceUnits,
        use_shapes: bool,
        overwrite: bool,
    ) -> Result<usize> {
        let mut timer = Timer::new("update link distances");
        let mut updates = Vec::new();
        for link in self.links.values() {
            if !overwrite && link.attributes.has("distance") {
                continue;
            }
            let length = match self.measure_link(link, use_shapes) {
                Some(x) => x,
                None => {
                    timer.warn(format!("{} has no geometry; can't compute distance", link.id));
                    continue;
                }
            };
            let value = match units {
                DistanceUnits::Miles => length.to_miles(),
                DistanceUnits::Meters => length.inner_meters(),
            };
            updates.push((link.id, value));
        }
        let count = updates.len();
        for (id, value) in updates {
            self.set_link_attribute(id, "distance", value)?;
        }
        info!("Updated distance on {} links", count);
        Ok(count)
    }

    fn measure_link(&self, link: &Link, use_shapes: bool) -> Option<Distance> {
        if use_shapes {
            if let Some(shape) = link.shape_id.as_ref().and_then(|s| self.shapes.get(s)) {
                return Some(shape.geometry.length());
            }
        }
        if let Ok(pl) = link.geometry() {
            return Some(pl.length());
        }
        let a = self.nodes.get(&link.a)?;
        let b = self.nodes.get(&link.b)?;
        Some(a.pt().gps_dist(b.pt()))
    }
}
