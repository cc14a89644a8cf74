//! Project cards: declarative descriptions of changes to a network.

mod add_delete;
mod properties;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scoped::{one_or_many, TimeSpan};
use crate::{FacilitySelection, Mode, Network, WranglerError};

/// One instruction for changing a link property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    /// What the card author expected the value to be. A mismatch only warns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Value>,
    /// Added to the current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<GroupChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeofday: Vec<TimeOfDayChange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupChange {
    #[serde(deserialize_with = "one_or_many")]
    pub category: Vec<String>,
    pub timeofday: Vec<TimeOfDayChange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayChange {
    pub time: TimeSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProjectChange {
    RoadwayPropertyChange {
        facility: FacilitySelection,
        properties: Vec<PropertyChange>,
    },
    ParallelManagedLanes {
        facility: FacilitySelection,
        properties: Vec<PropertyChange>,
    },
    AddNewRoadway {
        links: Vec<Map<String, Value>>,
        nodes: Vec<Map<String, Value>>,
    },
    /// Deletes every link and node whose attribute matches one of the listed values.
    RoadwayDeletion {
        links: BTreeMap<String, Vec<Value>>,
        nodes: BTreeMap<String, Vec<Value>>,
        ignore_missing: bool,
    },
}

impl ProjectChange {
    pub fn from_value(value: &Value) -> Result<ProjectChange> {
        let category = match value.get("category").and_then(|x| x.as_str()) {
            Some(x) => x,
            None => return Err(card_error("a change is missing its category")),
        };
        match category.to_lowercase().as_str() {
            "roadway property change" => Ok(ProjectChange::RoadwayPropertyChange {
                facility: facility(value)?,
                properties: required_field(value, "properties")?,
            }),
            "parallel managed lanes" => Ok(ProjectChange::ParallelManagedLanes {
                facility: facility(value)?,
                properties: required_field(value, "properties")?,
            }),
            "add new roadway" => Ok(ProjectChange::AddNewRoadway {
                links: optional_field(value, "links")?,
                nodes: optional_field(value, "nodes")?,
            }),
            "roadway deletion" => Ok(ProjectChange::RoadwayDeletion {
                links: optional_field(value, "links")?,
                nodes: optional_field(value, "nodes")?,
                ignore_missing: value
                    .get("ignore_missing")
                    .and_then(|x| x.as_bool())
                    .unwrap_or(true),
            }),
            _ => Err(card_error(format!("unsupported category {:?}", category))),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ProjectChange::RoadwayPropertyChange { .. } => "roadway property change",
            ProjectChange::ParallelManagedLanes { .. } => "parallel managed lanes",
            ProjectChange::AddNewRoadway { .. } => "add new roadway",
            ProjectChange::RoadwayDeletion { .. } => "roadway deletion",
        }
    }
}

/// A named project holding one or more changes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectCard {
    pub project: String,
    pub changes: Vec<ProjectChange>,
}

impl ProjectCard {
    /// A card either is a single change itself, or lists them under `changes`.
    pub fn from_value(value: &Value) -> Result<ProjectCard> {
        let project = match value.get("project").and_then(|x| x.as_str()) {
            Some(x) => x.to_string(),
            None => return Err(card_error("the card has no project name")),
        };
        let changes = match value.get("changes") {
            Some(Value::Array(list)) => list
                .iter()
                .map(ProjectChange::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(card_error("`changes` must be a list")),
            None => vec![ProjectChange::from_value(value)?],
        };
        Ok(ProjectCard { project, changes })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ProjectCard> {
        let path = path.as_ref();
        let value: Value = netutil::read_json(path)?;
        ProjectCard::from_value(&value).with_context(|| format!("reading {}", path.display()))
    }
}

impl Network {
    /// Applies every change of a card, in order. A failing change stops the card; earlier
    /// changes stay applied.
    pub fn apply_project_card(&mut self, card: &ProjectCard) -> Result<()> {
        info!("Applying project {}", card.project);
        for change in &card.changes {
            self.apply_change(change)
                .with_context(|| format!("{} in {}", change.describe(), card.project))?;
        }
        Ok(())
    }

    /// Like `apply_project_card`, but leaves `self` alone and returns the changed copy.
    pub fn with_project_card(&self, card: &ProjectCard) -> Result<Network> {
        let mut net = self.clone();
        net.apply_project_card(card)?;
        Ok(net)
    }

    pub fn apply_change(&mut self, change: &ProjectChange) -> Result<()> {
        match change {
            ProjectChange::RoadwayPropertyChange {
                facility,
                properties,
            } => {
                let links = self.select_roadway_features(facility, Mode::Drive, false)?;
                self.apply_roadway_feature_change(&links, properties)
            }
            ProjectChange::ParallelManagedLanes {
                facility,
                properties,
            } => {
                let links = self.select_roadway_features(facility, Mode::Drive, false)?;
                self.apply_managed_lane_feature_change(&links, properties)
            }
            ProjectChange::AddNewRoadway { links, nodes } => {
                self.add_new_roadway_feature_change(links, nodes)
            }
            ProjectChange::RoadwayDeletion {
                links,
                nodes,
                ignore_missing,
            } => self.delete_roadway_feature_change(links, nodes, *ignore_missing),
        }
    }
}

fn card_error<S: Into<String>>(msg: S) -> anyhow::Error {
    WranglerError::InvalidProjectCard(msg.into()).into()
}

fn facility(value: &Value) -> Result<FacilitySelection> {
    match value.get("facility") {
        Some(x) => FacilitySelection::from_value(x.clone()),
        None => Err(card_error("the change has no facility")),
    }
}

fn required_field<T: DeserializeOwned>(value: &Value, key: &str) -> Result<T> {
    match value.get(key) {
        Some(x) => serde_json::from_value(x.clone())
            .map_err(|err| card_error(format!("bad `{}`: {}", key, err))),
        None => Err(card_error(format!("the change has no `{}`", key))),
    }
}

fn optional_field<T: DeserializeOwned + Default>(value: &Value, key: &str) -> Result<T> {
    match value.get(key) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(_) => required_field(value, key),
    }
}
