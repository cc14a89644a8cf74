use std::path::Path;

use anyhow::{Context, Result};

use netutil::Timer;

use crate::{Link, Network, Node, Shape, WranglerConfig};

pub const NODES_FILE: &str = "nodes.json";
pub const LINKS_FILE: &str = "links.json";
pub const SHAPES_FILE: &str = "shapes.json";

impl Network {
    /// Reads `nodes.json`, `links.json`, and `shapes.json` from a directory. Each holds a JSON
    /// array of records.
    pub fn load<P: AsRef<Path>>(dir: P, config: WranglerConfig) -> Result<Network> {
        let dir = dir.as_ref();
        let mut timer = Timer::new(&format!("load network from {}", dir.display()));

        timer.start("read nodes");
        let nodes: Vec<Node> = netutil::read_json(dir.join(NODES_FILE))?;
        timer.stop("read nodes");

        timer.start("read links");
        let links: Vec<Link> = netutil::read_json(dir.join(LINKS_FILE))?;
        timer.stop("read links");

        timer.start("read shapes");
        let shapes: Vec<Shape> = if dir.join(SHAPES_FILE).exists() {
            netutil::read_json(dir.join(SHAPES_FILE))?
        } else {
            timer.warn(format!("{} has no {}", dir.display(), SHAPES_FILE));
            Vec::new()
        };
        timer.stop("read shapes");

        timer.start("validate");
        let net = Network::new(nodes, links, shapes, config)
            .with_context(|| format!("loading network from {}", dir.display()))?;
        timer.stop("validate");
        Ok(net)
    }

    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let nodes: Vec<&Node> = self.nodes.values().collect();
        let links: Vec<&Link> = self.links.values().collect();
        let shapes: Vec<&Shape> = self.shapes.values().collect();
        netutil::write_json(dir.join(NODES_FILE), &nodes)?;
        netutil::write_json(dir.join(LINKS_FILE), &links)?;
        netutil::write_json(dir.join(SHAPES_FILE), &shapes)?;
        info!("Saved network to {}", dir.display());
        Ok(())
    }
}
