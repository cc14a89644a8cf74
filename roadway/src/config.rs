use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunables for selection and the managed-lane transformation. Every field has a default, so a
/// config file only needs to mention what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WranglerConfig {
    /// If a selection names any of these, it's matched directly and never path-searched.
    pub unique_link_ids: Vec<String>,
    /// How many times to expand the candidate subnet before the first shortest-path attempt.
    pub search_breadth: usize,
    /// Give up looking for a path after expanding this many times.
    pub max_search_breadth: usize,
    /// Links added by later expansions cost `1 + iteration * sp_weight_factor`, so paths prefer
    /// links that matched the query.
    pub sp_weight_factor: f64,
    pub managed_lanes: ManagedLaneConfig,
}

impl Default for WranglerConfig {
    fn default() -> WranglerConfig {
        WranglerConfig {
            unique_link_ids: vec!["model_link_id".to_string()],
            search_breadth: 5,
            max_search_breadth: 10,
            sp_weight_factor: 100.0,
            managed_lanes: ManagedLaneConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedLaneConfig {
    /// Added to a general-purpose node ID to get its managed-lane twin.
    pub node_id_scalar: i64,
    pub link_id_scalar: i64,
    /// Attributes the managed-lane copy inherits unchanged from the general-purpose link.
    pub keep_same_attributes: Vec<String>,
    pub additional_keep_same_attributes: Vec<String>,
    /// Every managed link must have these before it can be split.
    pub required_attributes: Vec<String>,
    /// Extra general-purpose attributes copied onto the access and egress connectors.
    pub additional_copy_to_access_egress: Vec<String>,
    /// How far to the right of the general-purpose geometry the managed lane is drawn.
    pub offset_meters: f64,
    pub name_prefix: String,
    pub access_name_prefix: String,
    pub egress_name_prefix: String,
    pub access_roadway: String,
    pub egress_roadway: String,
    pub connector_lanes: i64,
}

impl Default for ManagedLaneConfig {
    fn default() -> ManagedLaneConfig {
        ManagedLaneConfig {
            node_id_scalar: 4_500_000,
            link_id_scalar: 10_000_000,
            keep_same_attributes: [
                "distance",
                "bike_access",
                "drive_access",
                "transit_access",
                "walk_access",
                "maxspeed",
                "name",
                "oneway",
                "ref",
                "roadway",
                "length",
                "segment_id",
                "ft",
                "assignable",
            ]
            .iter()
            .map(|x| x.to_string())
            .collect(),
            additional_keep_same_attributes: Vec::new(),
            required_attributes: ["A", "B", "model_link_id", "locationReferences"]
                .iter()
                .map(|x| x.to_string())
                .collect(),
            additional_copy_to_access_egress: Vec::new(),
            offset_meters: 10.0,
            name_prefix: "Managed Lane ".to_string(),
            access_name_prefix: "Access Dummy ".to_string(),
            egress_name_prefix: "Egress Dummy ".to_string(),
            access_roadway: "ml_access".to_string(),
            egress_roadway: "ml_egress".to_string(),
            connector_lanes: 1,
        }
    }
}

impl WranglerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<WranglerConfig> {
        let config: WranglerConfig = netutil::read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_search_breadth < self.search_breadth {
            bail!(
                "max_search_breadth ({}) is smaller than search_breadth ({})",
                self.max_search_breadth,
                self.search_breadth
            );
        }
        if !self.sp_weight_factor.is_finite() || self.sp_weight_factor < 0.0 {
            bail!("sp_weight_factor must be non-negative, not {}", self.sp_weight_factor);
        }
        let ml = &self.managed_lanes;
        if ml.node_id_scalar <= 0 || ml.link_id_scalar <= 0 {
            bail!("managed lane ID scalars must be positive");
        }
        if !ml.offset_meters.is_finite() {
            bail!("managed lane offset must be finite");
        }
        if ml.access_roadway == ml.egress_roadway {
            bail!("access and egress connectors need different roadway tags");
        }
        Ok(())
    }

    /// Everything the managed-lane copy keeps from its general-purpose link.
    pub fn managed_lane_keep_attributes(&self) -> Vec<&str> {
        let ml = &self.managed_lanes;
        ml.keep_same_attributes
            .iter()
            .chain(ml.additional_keep_same_attributes.iter())
            .chain(ml.required_attributes.iter())
            .map(|x| x.as_str())
            .collect()
    }
}
