//! Small utilities shared by every crate in the workspace: logging setup, a lightweight timer,
//! collection helpers, and JSON file IO.

#[macro_use]
extern crate log;

mod collections;
mod io;
pub mod logger;
mod time;

pub use crate::collections::{Counter, MultiMap};
pub use crate::io::{from_json, read_json, to_json, write_json};
pub use crate::time::{elapsed_seconds, prettyprint_time, prettyprint_usize, Timer};
