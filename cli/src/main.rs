//! Command-line access to roadway networks: select facilities, apply project cards, build the
//! managed-lane network, and check the result.

#[macro_use]
extern crate log;

use anyhow::Result;
use serde_json::Value;
use structopt::StructOpt;

use netutil::Timer;
use roadway::{FacilitySelection, Mode, Network, ProjectCard, WranglerConfig};

#[derive(StructOpt)]
#[structopt(name = "wrangler", about = "Edits and checks roadway networks")]
struct Args {
    /// A JSON file overriding the default settings. Missing fields keep their defaults.
    #[structopt(long, global = true)]
    config: Option<String>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Print the links a facility selection refers to, as a JSON list of IDs
    Select {
        /// The directory holding nodes.json, links.json, and optionally shapes.json
        #[structopt(long)]
        network: String,
        /// A JSON file with a facility, like `{"link": [{"name": ["Main St"]}], "A": {...}, "B":
        /// {...}}`
        #[structopt(long)]
        selection: String,
        /// Which mode's links can be part of the facility
        #[structopt(long, default_value = "drive")]
        mode: Mode,
    },
    /// Apply project cards in order, then write the network
    Apply {
        #[structopt(long)]
        network: String,
        /// Project card JSON files, applied in the order given
        #[structopt(long, required = true)]
        cards: Vec<String>,
        /// The directory to write the changed network to
        #[structopt(long)]
        output: String,
    },
    /// Split links flagged as managed into general-purpose and managed lanes, and write the result
    ManagedLanes {
        #[structopt(long)]
        network: String,
        #[structopt(long)]
        output: String,
    },
    /// Check that links, nodes, and shapes refer to each other correctly
    Validate {
        #[structopt(long)]
        network: String,
    },
    /// Report the strongly connected parts of the network usable by one mode
    Connectivity {
        #[structopt(long)]
        network: String,
        #[structopt(long, default_value = "drive")]
        mode: Mode,
    },
}

fn main() -> Result<()> {
    netutil::logger::setup();
    let args = Args::from_args();
    let config = match args.config {
        Some(path) => WranglerConfig::load(path)?,
        None => WranglerConfig::default(),
    };

    match args.cmd {
        Command::Select {
            network,
            selection,
            mode,
        } => select(Network::load(network, config)?, selection, mode),
        Command::Apply {
            network,
            cards,
            output,
        } => apply(Network::load(network, config)?, cards, output),
        Command::ManagedLanes { network, output } => {
            let mut net = Network::load(network, config)?;
            net.create_managed_lane_network()?;
            net.save(output)
        }
        Command::Validate { network } => validate(Network::load(network, config)?),
        Command::Connectivity { network, mode } => {
            connectivity(&Network::load(network, config)?, mode);
            Ok(())
        }
    }
}

fn select(mut net: Network, path: String, mode: Mode) -> Result<()> {
    let raw: Value = netutil::read_json(&path)?;
    let selection = FacilitySelection::from_value(raw)?;
    let links = net.select_roadway_features(&selection, mode, false)?;
    let ids: Vec<i64> = links.into_iter().map(|l| l.0).collect();
    println!("{}", netutil::to_json(&ids)?);
    Ok(())
}

fn apply(mut net: Network, cards: Vec<String>, output: String) -> Result<()> {
    let mut timer = Timer::new(&format!("apply {} project cards", cards.len()));
    for path in cards {
        timer.start(&path);
        let card = ProjectCard::load(&path)?;
        net.apply_project_card(&card)?;
        timer.stop(&path);
    }
    timer.done();
    let stats = net.selections().stats();
    info!(
        "Selections: {} answered from the cache, {} computed, {} path searches",
        stats.hits, stats.misses, stats.path_searches
    );
    net.save(output)
}

fn validate(net: Network) -> Result<()> {
    let report = net.check_consistency();
    for shape in &report.orphan_shapes {
        warn!("{} isn't used by any link", shape);
    }
    if report.is_ok() {
        println!(
            "{} nodes, {} links, and {} shapes are consistent",
            netutil::prettyprint_usize(net.all_nodes().len()),
            netutil::prettyprint_usize(net.all_links().len()),
            netutil::prettyprint_usize(net.all_shapes().len())
        );
    }
    report.into_result()
}

fn connectivity(net: &Network, mode: Mode) {
    let components = net.assess_connectivity(mode);
    if components.len() <= 1 {
        println!("The {} network is strongly connected", mode);
        return;
    }
    println!(
        "The {} network has {} strongly connected components",
        mode,
        components.len()
    );
    for (idx, nodes) in components.iter().enumerate() {
        let sample: Vec<String> = nodes.iter().take(5).map(|n| n.0.to_string()).collect();
        println!(
            "- #{}: {} nodes, including {}",
            idx + 1,
            nodes.len(),
            sample.join(", ")
        );
    }
}
