//! Splits links flagged as managed into a general-purpose link and a parallel managed lane,
//! joined by access and egress connectors.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;

use geom::{Distance, LonLat, PolyLine};

use crate::config::ManagedLaneConfig;
use crate::ids::IdAllocator;
use crate::{Link, LinkID, Network, Node, NodeID, Shape, ShapeID, WranglerError};

const SHADOW_PREFIX: &str = "ML_";

impl Network {
    /// True once the managed-lane transformation has run, judging by the presence of access
    /// connectors.
    pub fn has_managed_lane_connectors(&self) -> bool {
        let tag = &self.config.managed_lanes.access_roadway;
        self.links.values().any(|l| l.roadway() == Some(tag.as_str()))
    }

    /// Splits every managed link in place. The new tables are fully built and checked before
    /// they replace the old ones, so on error nothing changes. If access connectors already
    /// exist, this logs an error and does nothing.
    pub fn create_managed_lane_network(&mut self) -> Result<()> {
        if self.has_managed_lane_connectors() {
            error!(
                "Managed lane access links already exist; not creating them again. Leaving the \
                 network as-is."
            );
            return Ok(());
        }
        let (nodes, links, shapes) = Transformer::new(self).build(self)?;
        self.replace_tables(nodes, links, shapes)
    }

    /// Like `create_managed_lane_network`, but returns a new network and leaves this one alone.
    pub fn to_managed_lane_network(&self) -> Result<Network> {
        let mut net = self.clone();
        net.create_managed_lane_network()?;
        Ok(net)
    }

    /// Nodes created for managed lanes. Subtracting the node offset from any of these gives the
    /// general-purpose node it mirrors.
    pub fn managed_lane_node_ids(&self) -> Vec<NodeID> {
        let scalar = self.config.managed_lanes.node_id_scalar;
        self.nodes
            .keys()
            .filter(|n| n.0 >= scalar && self.nodes.contains_key(&NodeID(n.0 - scalar)))
            .cloned()
            .collect()
    }
}

type Tables = (
    BTreeMap<NodeID, Node>,
    BTreeMap<LinkID, Link>,
    BTreeMap<ShapeID, Shape>,
);

struct Transformer {
    cfg: ManagedLaneConfig,
    keep: Vec<String>,
    node_ids: IdAllocator,
    link_ids: IdAllocator,
}

struct Pair {
    gp: Link,
    ml: Link,
    access: Link,
    egress: Link,
}

impl Transformer {
    fn new(net: &Network) -> Transformer {
        Transformer {
            cfg: net.config.managed_lanes.clone(),
            keep: net
                .config
                .managed_lane_keep_attributes()
                .into_iter()
                .map(|x| x.to_string())
                .collect(),
            node_ids: IdAllocator::new("node", net.nodes.keys().map(|n| n.0)),
            link_ids: IdAllocator::new("link", net.links.keys().map(|l| l.0)),
        }
    }

    fn build(mut self, net: &Network) -> Result<Tables> {
        let mut pairs = Vec::new();
        let mut untouched = Vec::new();
        for link in net.links.values() {
            if link.is_managed() {
                pairs.push(self.split(link)?);
            } else {
                let mut link = link.clone();
                strip_shadows(&mut link);
                untouched.push(link);
            }
        }
        info!(
            "Splitting {} managed links; {} links stay as they are",
            pairs.len(),
            untouched.len()
        );

        let mut new_nodes = BTreeMap::new();
        let mut new_shapes = Vec::new();
        for pair in &pairs {
            for (id, pt) in [
                (pair.ml.a, pair.ml.first_pt()),
                (pair.ml.b, pair.ml.last_pt()),
            ] {
                if net.nodes.contains_key(&id) || new_nodes.contains_key(&id) {
                    continue;
                }
                let pt = match pt {
                    Some(pt) => pt,
                    None => bail!("{} has no geometry to place {} at", pair.ml.id, id),
                };
                let mut node = Node::new(id, pt);
                node.attributes.insert("drive_access", 1);
                new_nodes.insert(id, node);
            }
            for link in [&pair.ml, &pair.access, &pair.egress] {
                new_shapes.push(Shape::new(link.geometry()?));
            }
        }

        // Later links replace earlier ones with the same endpoints. That's how connectors
        // coinciding with an existing link, or with each other at a shared node, get absorbed.
        let mut by_endpoints: BTreeMap<(NodeID, NodeID), Link> = BTreeMap::new();
        let mut order = Vec::new();
        order.extend(pairs.iter().map(|p| p.gp.clone()));
        order.extend(pairs.iter().map(|p| p.ml.clone()));
        order.extend(pairs.iter().map(|p| p.access.clone()));
        order.extend(pairs.iter().map(|p| p.egress.clone()));
        order.extend(untouched);
        let total = order.len();
        for link in order {
            by_endpoints.insert(link.endpoints(), link);
        }
        if by_endpoints.len() < total {
            debug!(
                "Dropped {} links duplicating another link's endpoints",
                total - by_endpoints.len()
            );
        }

        let mut links = BTreeMap::new();
        for link in by_endpoints.into_values() {
            let id = link.id;
            if links.insert(id, link).is_some() {
                return Err(WranglerError::IdCollision(format!("{} was generated twice", id)).into());
            }
        }

        let mut nodes = net.nodes.clone();
        nodes.extend(new_nodes);
        let mut shapes = net.shapes.clone();
        for shape in new_shapes {
            shapes.entry(shape.id.clone()).or_insert(shape);
        }
        Ok((nodes, links, shapes))
    }

    fn split(&mut self, link: &Link) -> Result<Pair> {
        for attribute in &self.cfg.required_attributes {
            if !link.has_field(attribute) {
                return Err(WranglerError::MissingAttribute {
                    link: link.id,
                    attribute: attribute.clone(),
                }
                .into());
            }
        }

        let mut gp = link.clone();
        strip_shadows(&mut gp);
        gp.attributes.insert("managed", 0);

        let ml = self.managed_lane(link)?;
        let gp_pl = gp.geometry()?;
        let ml_pl = ml.geometry()?;

        // Managed lanes live in the first scalar band above the originals, access connectors in
        // the second, egress in the third. Bands don't overlap while every ID is below the scalar.
        let scalar = self.cfg.link_id_scalar;
        let access_id = self.link_ids.claim_sum(&[gp.id.0, scalar, scalar])?;
        let egress_id = self.link_ids.claim_sum(&[gp.id.0, scalar, scalar, scalar])?;
        let access = self.connector(
            &gp,
            &ml,
            access_id,
            (gp.a, ml.a),
            (gp_pl.first_pt(), ml_pl.first_pt()),
            true,
        )?;
        let egress = self.connector(
            &gp,
            &ml,
            egress_id,
            (ml.b, gp.b),
            (ml_pl.last_pt(), gp_pl.last_pt()),
            false,
        )?;
        Ok(Pair {
            gp,
            ml,
            access,
            egress,
        })
    }

    /// Only keeps the configured attributes, with `ML_` shadow values taking precedence.
    fn managed_lane(&mut self, link: &Link) -> Result<Link> {
        let a = NodeID(self.node_ids.derive(link.a.0, self.cfg.node_id_scalar)?);
        let b = NodeID(self.node_ids.derive(link.b.0, self.cfg.node_id_scalar)?);
        let id = LinkID(self.link_ids.claim_sum(&[link.id.0, self.cfg.link_id_scalar])?);
        let mut ml = Link::new(id, a, b);

        for (k, v) in link.attributes.iter() {
            if !k.starts_with(SHADOW_PREFIX) && self.keep.contains(k) {
                ml.attributes.insert(k.clone(), v.clone());
            }
        }
        ml.attributes
            .insert("name", format!("{}{}", self.cfg.name_prefix, link.name()));
        for (k, v) in link.attributes.iter() {
            if let Some(base) = k.strip_prefix(SHADOW_PREFIX) {
                if k != "ML_ACCESS" && k != "ML_EGRESS" {
                    ml.attributes.insert(base, v.clone());
                }
            }
        }
        ml.attributes.insert("managed", 1);

        let pl = link
            .geometry()?
            .shift_perpendicular(Distance::meters(self.cfg.offset_meters));
        ml.set_geometry(&pl);
        ml.shape_id = Some(ShapeID::from_geometry(&pl));
        Ok(ml)
    }

    fn connector(
        &self,
        gp: &Link,
        ml: &Link,
        id: i64,
        (a, b): (NodeID, NodeID),
        (pt1, pt2): (LonLat, LonLat),
        access: bool,
    ) -> Result<Link> {
        let mut link = Link::new(LinkID(id), a, b);
        let pl = PolyLine::new(vec![pt1, pt2])?;
        link.set_geometry(&pl);
        link.shape_id = Some(ShapeID::from_geometry(&pl));

        let (prefix, roadway) = if access {
            (&self.cfg.access_name_prefix, &self.cfg.access_roadway)
        } else {
            (&self.cfg.egress_name_prefix, &self.cfg.egress_roadway)
        };
        if let Some(x) = ml.attributes.get("access") {
            link.attributes.insert("access", x.clone());
        }
        if let Some(x) = gp.attributes.get("drive_access") {
            link.attributes.insert("drive_access", x.clone());
        }
        for attribute in &self.cfg.additional_copy_to_access_egress {
            if let Some(x) = gp.attributes.get(attribute) {
                link.attributes.insert(attribute.clone(), x.clone());
            }
        }
        link.attributes
            .insert("name", format!("{}{}", prefix, gp.name()));
        link.attributes.insert("lanes", self.cfg.connector_lanes);
        link.attributes.insert("roadway", roadway.clone());
        link.attributes.insert(
            "ref",
            gp.attributes.get("ref").cloned().unwrap_or_else(|| Value::from("")),
        );

        if pl.is_degenerate() {
            warn!(
                "{} connecting {} and {} has zero length",
                link.id, gp.id, ml.id
            );
        }
        link.attributes
            .insert("distance", pl.length().to_miles());
        Ok(link)
    }
}

fn strip_shadows(link: &mut Link) {
    link.attributes.retain(|k, _| !k.starts_with(SHADOW_PREFIX));
}
