use petgraph::graphmap::DiGraphMap;

use crate::{LinkID, Mode, Network, NodeID};

impl Network {
    /// Links usable by a mode, and the nodes they touch.
    pub fn modal_links(&self, mode: Mode) -> Vec<LinkID> {
        self.links
            .values()
            .filter(|l| l.has_access(mode))
            .map(|l| l.id)
            .collect()
    }

    pub fn modal_graph(&self, mode: Mode) -> DiGraphMap<NodeID, LinkID> {
        let mut graph = DiGraphMap::new();
        for l in self.modal_links(mode) {
            let link = self.get_l(l);
            graph.add_edge(link.a, link.b, l);
        }
        graph
    }

    /// Strongly connected components of the mode's graph, largest first. Anything besides the
    /// first is an island unreachable from (or unable to reach) the rest.
    pub fn assess_connectivity(&self, mode: Mode) -> Vec<Vec<NodeID>> {
        let graph = self.modal_graph(mode);
        let mut components = petgraph::algo::kosaraju_scc(&graph);
        for c in &mut components {
            c.sort();
        }
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        if components.len() > 1 {
            info!(
                "The {} network has {} strongly connected components; the largest has {} nodes",
                mode,
                components.len(),
                components[0].len()
            );
        }
        components
    }

    pub fn is_network_connected(&self, mode: Mode) -> bool {
        self.assess_connectivity(mode).len() <= 1
    }
}
