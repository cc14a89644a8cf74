use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use petgraph::graphmap::DiGraphMap;

use crate::{LinkID, Network, NodeID, WranglerError};

/// The part of the network a selection searches for a path through. Starts as the links that
/// matched the query, and grows outward one ring of neighbors at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct Subnet {
    /// Each link remembers the expansion round that added it. 0 means it matched the query.
    links: BTreeMap<LinkID, usize>,
    nodes: BTreeSet<NodeID>,
    iteration: usize,
}

impl Subnet {
    pub fn new<I: IntoIterator<Item = LinkID>>(seed: I, net: &Network) -> Subnet {
        let mut subnet = Subnet {
            links: BTreeMap::new(),
            nodes: BTreeSet::new(),
            iteration: 0,
        };
        for l in seed {
            subnet.add(l, 0, net);
        }
        subnet
    }

    fn add(&mut self, id: LinkID, iteration: usize, net: &Network) {
        if let Some(link) = net.maybe_get_l(id) {
            self.links.entry(id).or_insert(iteration);
            self.nodes.insert(link.a);
            self.nodes.insert(link.b);
        }
    }

    pub fn links(&self) -> &BTreeMap<LinkID, usize> {
        &self.links
    }

    pub fn contains_node(&self, n: NodeID) -> bool {
        self.nodes.contains(&n)
    }

    /// How many times this has been expanded.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Adds every link whose reference ID appears in the adjacency lists of a node already in
    /// the subnet. Returns how many links were added.
    pub fn expand(&mut self, net: &Network) -> usize {
        self.iteration += 1;
        let mut found = BTreeSet::new();
        for n in &self.nodes {
            if let Some(node) = net.maybe_get_n(*n) {
                for reference_id in node.all_reference_ids() {
                    for l in net.links_with_reference_id(reference_id) {
                        if !self.links.contains_key(l) {
                            found.insert(*l);
                        }
                    }
                }
            }
        }
        let added = found.len();
        for l in found {
            self.add(l, self.iteration, net);
        }
        debug!(
            "Expansion {} of subnet added {} links, now {}",
            self.iteration,
            added,
            self.links.len()
        );
        added
    }

    /// The cost of traversing a link here. Links the query matched cost 1; links found by later
    /// expansions cost more, so paths prefer staying on the facility.
    pub fn link_weight(&self, id: LinkID, weight_factor: f64) -> Option<f64> {
        self.links
            .get(&id)
            .map(|i| 1.0 + (*i as f64) * weight_factor)
    }

    /// Finds the cheapest path between two nodes using only links in the subnet. Returns the
    /// nodes and links along the way, in order.
    pub fn shortest_path(
        &self,
        net: &Network,
        from: NodeID,
        to: NodeID,
        weight_factor: f64,
    ) -> Option<(Vec<NodeID>, Vec<LinkID>)> {
        let mut graph: DiGraphMap<NodeID, LinkID> = DiGraphMap::new();
        for id in self.links.keys() {
            let link = net.get_l(*id);
            graph.add_edge(link.a, link.b, *id);
        }
        if !graph.contains_node(from) || !graph.contains_node(to) {
            return None;
        }
        let (_, nodes) = petgraph::algo::astar(
            &graph,
            from,
            |n| n == to,
            |(_, _, l)| self.link_weight(*l, weight_factor).unwrap_or(f64::MAX),
            |_| 0.0,
        )?;
        let links = nodes
            .windows(2)
            .map(|pair| graph.edge_weight(pair[0], pair[1]).cloned())
            .collect::<Option<Vec<LinkID>>>()?;
        Some((nodes, links))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchParams {
    pub search_breadth: usize,
    pub max_search_breadth: usize,
    pub weight_factor: f64,
}

/// Grows the subnet until it touches both endpoints (or passes `search_breadth` expansions),
/// then looks for a path, expanding once more after every failed attempt. Gives up once the
/// expansions pass `max_search_breadth`, or as soon as an expansion adds nothing new. A breadth
/// of 0 still allows one expansion.
pub fn path_search(
    net: &Network,
    subnet: &mut Subnet,
    from: NodeID,
    to: NodeID,
    params: &SearchParams,
) -> Result<(Vec<NodeID>, Vec<LinkID>)> {
    while !(subnet.contains_node(from) && subnet.contains_node(to))
        && subnet.iteration() <= params.search_breadth
    {
        if subnet.expand(net) == 0 {
            break;
        }
    }

    loop {
        if let Some(path) = subnet.shortest_path(net, from, to, params.weight_factor) {
            debug!(
                "Found a path from {} to {} with {} links after {} expansions",
                from,
                to,
                path.1.len(),
                subnet.iteration()
            );
            return Ok(path);
        }
        if subnet.iteration() > params.max_search_breadth {
            break;
        }
        if subnet.expand(net) == 0 {
            debug!("Subnet stopped growing after {} expansions", subnet.iteration());
            break;
        }
    }
    Err(WranglerError::NoPathFound {
        from,
        to,
        breadth: subnet.iteration(),
    }
    .into())
}
