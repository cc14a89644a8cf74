use std::collections::BTreeMap;
use std::fmt;

use crate::selection::Predicate;
use crate::{LinkID, NodeID, WranglerError};

/// Identifies a selection: the canonical query (including the mode filter) and the resolved
/// endpoints, if the selection has any.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectionKey {
    pub query: String,
    pub endpoints: Option<(NodeID, NodeID)>,
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.endpoints {
            Some((a, b)) => write!(f, "{} from {} to {}", self.query, a, b),
            None => write!(f, "{}", self.query),
        }
    }
}

/// Everything worked out while answering one selection.
#[derive(Clone, Debug)]
pub struct Selection {
    pub key: SelectionKey,
    /// The predicate actually used for the candidate query, after any `name` to `ref` fallback.
    pub query: Predicate,
    /// Links the subnet held when the search finished, with the expansion round that added each.
    pub candidates: BTreeMap<LinkID, usize>,
    pub route: Vec<NodeID>,
    /// Did this selection need a path search?
    pub searched: bool,
    pub outcome: Result<Vec<LinkID>, WranglerError>,
}

impl Selection {
    pub fn found(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub path_searches: usize,
}

/// Remembers selections, successful or not, until the network's structure changes.
#[derive(Clone, Debug, Default)]
pub struct SelectionCache {
    entries: BTreeMap<SelectionKey, Selection>,
    stats: CacheStats,
}

impl SelectionCache {
    pub fn new() -> SelectionCache {
        SelectionCache::default()
    }

    pub fn get(&self, key: &SelectionKey) -> Option<&Selection> {
        self.entries.get(key)
    }

    /// Answers from the cache if possible, counting a hit or miss. A cached failure becomes
    /// `SelectionPreviouslyFailed`.
    pub(crate) fn lookup(&mut self, key: &SelectionKey) -> Option<Result<Vec<LinkID>, WranglerError>> {
        match self.entries.get(key) {
            Some(selection) => {
                self.stats.hits += 1;
                Some(match selection.outcome {
                    Ok(ref links) => Ok(links.clone()),
                    Err(_) => Err(WranglerError::SelectionPreviouslyFailed(key.to_string())),
                })
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub(crate) fn record(&mut self, selection: Selection) {
        if selection.searched {
            self.stats.path_searches += 1;
        }
        self.entries.insert(selection.key.clone(), selection);
    }

    /// Forgets every selection. Stats keep counting.
    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            debug!("Dropping {} cached selections", self.entries.len());
            self.entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
