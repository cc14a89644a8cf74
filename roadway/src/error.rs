use std::fmt;

use crate::{LinkID, NodeID};

/// Failures a caller may want to tell apart. These travel inside `anyhow::Error`; use
/// `err.downcast_ref::<WranglerError>()` to inspect them.
#[derive(Clone, Debug, PartialEq)]
pub enum WranglerError {
    /// The selection itself is malformed.
    SelectionFormat(String),
    /// Nothing matched, even after falling back from `name` to `ref`.
    SelectionFailed(String),
    /// This exact selection already failed against the current network.
    SelectionPreviouslyFailed(String),
    NoPathFound {
        from: NodeID,
        to: NodeID,
        breadth: usize,
    },
    /// A link points at a node or shape that doesn't exist.
    ForeignKeyValue(String),
    Uniqueness(String),
    IdCollision(String),
    MissingAttribute {
        link: LinkID,
        attribute: String,
    },
    InvalidProperty(String),
    InvalidProjectCard(String),
}

impl fmt::Display for WranglerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WranglerError::SelectionFormat(x) => write!(f, "bad selection: {}", x),
            WranglerError::SelectionFailed(x) => write!(f, "selection failed: {}", x),
            WranglerError::SelectionPreviouslyFailed(key) => write!(
                f,
                "selection was previously queried and no links were found: {}",
                key
            ),
            WranglerError::NoPathFound { from, to, breadth } => write!(
                f,
                "no path from {} to {} after expanding the search {} times",
                from, to, breadth
            ),
            WranglerError::ForeignKeyValue(x) => write!(f, "missing foreign key: {}", x),
            WranglerError::Uniqueness(x) => write!(f, "duplicate key: {}", x),
            WranglerError::IdCollision(x) => write!(f, "ID collision: {}", x),
            WranglerError::MissingAttribute { link, attribute } => {
                write!(f, "{} is missing required attribute {}", link, attribute)
            }
            WranglerError::InvalidProperty(x) => write!(f, "invalid property change: {}", x),
            WranglerError::InvalidProjectCard(x) => write!(f, "invalid project card: {}", x),
        }
    }
}

impl std::error::Error for WranglerError {}

/// Shortcut for checking which failure an `anyhow::Error` carries.
pub fn error_kind(err: &anyhow::Error) -> Option<&WranglerError> {
    err.downcast_ref::<WranglerError>()
}
