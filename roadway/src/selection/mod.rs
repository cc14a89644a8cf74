//! Turns a facility description into a concrete, ordered list of links.
//!
//! Selections that name a unique link ID are answered by a direct lookup. Everything else is a
//! corridor between two endpoint nodes: links matching the query seed a subnet, which grows
//! outward until a shortest path between the endpoints exists, and that path is the answer.

mod cache;
mod query;
mod subnet;

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;

pub use self::cache::{CacheStats, Selection, SelectionCache, SelectionKey};
pub use self::query::{FacilitySelection, Predicate};
pub use self::subnet::{path_search, SearchParams, Subnet};
use crate::{LinkID, Mode, Network, NodeID, WranglerError};

impl Network {
    /// Every link matching the predicate, in ID order.
    pub fn query_links(&self, predicate: &Predicate) -> Vec<LinkID> {
        self.links
            .values()
            .filter(|l| predicate.matches_link(l))
            .map(|l| l.id)
            .collect()
    }

    pub fn validate_selection(&self, sel: &FacilitySelection) -> Result<()> {
        if sel.link.is_empty() || sel.link.iter().any(|entry| entry.is_empty()) {
            return Err(format_error("`link` needs at least one non-empty clause"));
        }
        for (field, value) in sel.link_clauses() {
            if !self.link_attribute_exists(field) {
                return Err(format_error(format!("no link has the attribute `{}`", field)));
            }
            if value.is_null() || value.as_array().map(|x| x.is_empty()).unwrap_or(false) {
                return Err(format_error(format!("`{}` has no value to match", field)));
            }
        }
        if sel.a.is_some() != sel.b.is_some() {
            return Err(format_error("`A` and `B` must be given together"));
        }
        if sel.a.is_none() && !sel.uses_unique_link_id(&self.config.unique_link_ids) {
            return Err(format_error(format!(
                "without `A` and `B`, the selection must use one of {:?}",
                self.config.unique_link_ids
            )));
        }
        for endpoint in [&sel.a, &sel.b].into_iter().flatten() {
            self.endpoint_clause(endpoint)?;
        }
        Ok(())
    }

    fn endpoint_clause<'a>(&self, endpoint: &'a BTreeMap<String, Value>) -> Result<(&'a str, &'a Value)> {
        if endpoint.len() != 1 {
            return Err(format_error(format!(
                "an endpoint needs exactly one field, not {}",
                endpoint.len()
            )));
        }
        let (field, value) = endpoint.iter().next().ok_or_else(|| format_error("empty endpoint"))?;
        if !self.node_attribute_exists(field) {
            return Err(format_error(format!("no node has the attribute `{}`", field)));
        }
        Ok((field.as_str(), value))
    }

    fn resolve_endpoint(&self, endpoint: &BTreeMap<String, Value>) -> Result<NodeID> {
        let (field, value) = self.endpoint_clause(endpoint)?;
        let matches = self.find_node_by(field, value);
        match matches.len() {
            1 => Ok(matches[0]),
            0 => Err(format_error(format!("no node has {} = {}", field, value))),
            n => Err(format_error(format!("{} nodes have {} = {}", n, field, value))),
        }
    }

    /// The cache key this selection would be stored under.
    pub fn build_selection_key(&self, sel: &FacilitySelection, mode: Mode) -> Result<SelectionKey> {
        self.validate_selection(sel)?;
        if sel.uses_unique_link_id(&self.config.unique_link_ids) {
            return Ok(SelectionKey {
                query: Predicate::for_unique_links(sel, &self.config.unique_link_ids).to_string(),
                endpoints: None,
            });
        }
        let endpoints = match (&sel.a, &sel.b) {
            (Some(a), Some(b)) => (self.resolve_endpoint(a)?, self.resolve_endpoint(b)?),
            _ => return Err(format_error("`A` and `B` are required")),
        };
        if endpoints.0 == endpoints.1 {
            return Err(format_error(format!("`A` and `B` are both {}", endpoints.0)));
        }
        Ok(SelectionKey {
            query: Predicate::for_links(sel, Some(mode), &[]).to_string(),
            endpoints: Some(endpoints),
        })
    }

    /// Finds the links a facility description refers to. Results, including failures, are
    /// cached until the network's structure changes; `force_search` ignores the cache.
    pub fn select_roadway_features(
        &mut self,
        sel: &FacilitySelection,
        mode: Mode,
        force_search: bool,
    ) -> Result<Vec<LinkID>> {
        let key = self.build_selection_key(sel, mode)?;
        if !force_search {
            if let Some(result) = self.selections.lookup(&key) {
                debug!("Selection {} answered from the cache", key);
                return result.map_err(|err| err.into());
            }
        }

        let selection = self.run_selection(sel, mode, key);
        let result = selection.outcome.clone();
        match result {
            Ok(ref links) => info!("Selected {} links for {}", links.len(), selection.key),
            Err(ref err) => warn!("Selection {} failed: {}", selection.key, err),
        }
        self.selections.record(selection);
        result.map_err(|err| err.into())
    }

    /// Never fails outright; the outcome is recorded in the returned `Selection`.
    fn run_selection(&self, sel: &FacilitySelection, mode: Mode, key: SelectionKey) -> Selection {
        let mut selection = Selection {
            key,
            query: Predicate::All(Vec::new()),
            candidates: BTreeMap::new(),
            route: Vec::new(),
            searched: false,
            outcome: Ok(Vec::new()),
        };

        if sel.uses_unique_link_id(&self.config.unique_link_ids) {
            selection.query = Predicate::for_unique_links(sel, &self.config.unique_link_ids);
            let found = self.query_links(&selection.query);
            selection.outcome = if found.is_empty() {
                Err(WranglerError::SelectionFailed(
                    "no links match the unique link identifiers".to_string(),
                ))
            } else {
                Ok(found)
            };
            return selection;
        }

        selection.query = Predicate::for_links(sel, Some(mode), &[]);
        let mut candidates = self.query_links(&selection.query);
        if candidates.is_empty() {
            if !selection.query.fields().contains("name") {
                selection.outcome = Err(WranglerError::SelectionFailed(
                    "no links match, and there's no `name` to retry as `ref`".to_string(),
                ));
                return selection;
            }
            if !self.link_attribute_exists("ref") {
                selection.outcome = Err(WranglerError::SelectionFailed(
                    "no links match `name`, and the network has no `ref` attribute to try"
                        .to_string(),
                ));
                return selection;
            }
            debug!("Nothing matched {}; trying `ref` instead of `name`", selection.query);
            selection.query = selection.query.rename_field("name", "ref");
            candidates = self.query_links(&selection.query);
            if candidates.is_empty() {
                selection.outcome = Err(WranglerError::SelectionFailed(
                    "no links match using either `name` or `ref`".to_string(),
                ));
                return selection;
            }
        }

        let (from, to) = match selection.key.endpoints {
            Some(pair) => pair,
            None => {
                selection.outcome = Err(WranglerError::SelectionFormat(
                    "`A` and `B` are required".to_string(),
                ));
                return selection;
            }
        };
        let params = SearchParams {
            search_breadth: self.config.search_breadth,
            max_search_breadth: self.config.max_search_breadth,
            weight_factor: self.config.sp_weight_factor,
        };
        let mut subnet = Subnet::new(candidates, self);
        selection.searched = true;
        let result = path_search(self, &mut subnet, from, to, &params);
        selection.candidates = subnet.links().clone();
        let (route, path) = match result {
            Ok(x) => x,
            Err(err) => {
                selection.outcome = Err(match err.downcast::<WranglerError>() {
                    Ok(x) => x,
                    Err(other) => WranglerError::SelectionFailed(other.to_string()),
                });
                return selection;
            }
        };
        selection.route = route;

        // The path may detour onto links that only connect the facility. With more than one
        // clause, keep only links that satisfy the rest of the description.
        let selected = if sel.num_link_clauses() > 1 {
            let refilter = Predicate::for_links(sel, Some(mode), &["name", "ref"]);
            path.into_iter()
                .filter(|l| refilter.matches_link(self.get_l(*l)))
                .collect()
        } else {
            path
        };
        selection.outcome = if selected.is_empty() {
            Err(WranglerError::SelectionFailed(
                "a path was found, but none of its links match the selection".to_string(),
            ))
        } else {
            Ok(selected)
        };
        selection
    }
}

fn format_error<S: Into<String>>(msg: S) -> anyhow::Error {
    WranglerError::SelectionFormat(msg.into()).into()
}
