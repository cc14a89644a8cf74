//! The roadway side of a network editor: a node/link/shape network, selection of links from
//! declarative facility descriptions, project cards, and the managed-lane transformation.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub use crate::config::{ManagedLaneConfig, WranglerConfig};
pub use crate::consistency::ConsistencyReport;
pub use crate::edits::{
    GroupChange, ProjectCard, ProjectChange, PropertyChange, TimeOfDayChange,
};
pub use crate::error::{error_kind, WranglerError};
pub use crate::ids::IdAllocator;
pub use crate::io::{LINKS_FILE, NODES_FILE, SHAPES_FILE};
pub use crate::mode::Mode;
pub use crate::network::{DistanceUnits, Network};
pub use crate::objects::attributes::Attributes;
pub use crate::objects::link::{Link, LinkID, LocationReference};
pub use crate::objects::node::{Node, NodeID};
pub use crate::objects::shape::{Shape, ShapeID};
pub use crate::scoped::{parse_time, resolve_value, ScopedEntry, ScopedValue, TimeSpan};
pub use crate::selection::{
    path_search, CacheStats, FacilitySelection, Predicate, SearchParams, Selection,
    SelectionCache, SelectionKey, Subnet,
};

mod config;
mod connectivity;
mod consistency;
mod edits;
mod error;
mod ids;
mod io;
mod managed_lanes;
mod mode;
mod network;
mod objects;
mod scoped;
mod selection;
