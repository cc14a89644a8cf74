use anyhow::Result;
use serde_json::Value;

use crate::edits::PropertyChange;
use crate::objects::attributes::{add_values, values_equal};
use crate::scoped::{ScopedEntry, ScopedValue};
use crate::{Link, LinkID, Network, WranglerError};

/// Property changes can't touch the fields that tie a link into the network.
fn reject_structural(properties: &[PropertyChange]) -> Result<()> {
    let structural: Vec<&str> = properties
        .iter()
        .map(|p| p.property.as_str())
        .filter(|p| Link::is_structural(p))
        .collect();
    if structural.is_empty() {
        Ok(())
    } else {
        Err(WranglerError::InvalidProperty(format!(
            "{} can't be changed as properties",
            structural.join(", ")
        ))
        .into())
    }
}

impl Network {
    /// `change` and `existing` only make sense for properties the network already has.
    pub fn validate_properties(&self, properties: &[PropertyChange]) -> Result<()> {
        reject_structural(properties)?;
        let mut problems = Vec::new();
        for p in properties {
            let exists = self.link_attribute_exists(&p.property);
            if !exists && p.change.is_some() {
                problems.push(format!(
                    "`change` is given for {}, but no link has it",
                    p.property
                ));
            }
            if !exists && p.existing.is_some() {
                problems.push(format!(
                    "`existing` is given for {}, but no link has it",
                    p.property
                ));
            }
            if p.change.is_some() && p.existing.is_none() {
                warn!("`change` is given for {} without `existing`", p.property);
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(WranglerError::InvalidProperty(problems.join("; ")).into())
        }
    }

    /// Sets or changes properties on exactly these links. Every new value is worked out before
    /// any is written.
    pub fn apply_roadway_feature_change(
        &mut self,
        links: &[LinkID],
        properties: &[PropertyChange],
    ) -> Result<()> {
        self.validate_properties(properties)?;
        let mut updates = Vec::new();
        for p in properties {
            if let Some(ref expected) = p.existing {
                if links.iter().any(|l| {
                    !self
                        .current_value(*l, &p.property)
                        .map(|x| values_equal(&x, expected))
                        .unwrap_or(false)
                }) {
                    warn!(
                        "Existing value {} for {} doesn't match all of the selected links",
                        expected, p.property
                    );
                }
            }
            for l in links {
                let value = match (&p.set, &p.change) {
                    (Some(x), _) => x.clone(),
                    (None, Some(delta)) => self.changed_value(*l, &p.property, delta)?,
                    (None, None) => {
                        return Err(WranglerError::InvalidProperty(format!(
                            "{} needs either `set` or `change`",
                            p.property
                        ))
                        .into())
                    }
                };
                updates.push((*l, p.property.clone(), value));
            }
        }
        for (l, property, value) in updates {
            self.set_link_attribute(l, &property, value)?;
        }
        info!(
            "Changed {} properties on {} links",
            properties.len(),
            links.len()
        );
        Ok(())
    }

    /// Flags the links as managed and writes managed-lane properties onto them. Properties with
    /// `group` or `timeofday` become scoped values.
    pub fn apply_managed_lane_feature_change(
        &mut self,
        links: &[LinkID],
        properties: &[PropertyChange],
    ) -> Result<()> {
        reject_structural(properties)?;
        let mut updates = Vec::new();
        for p in properties {
            for l in links {
                let mut value = self.managed_lane_value(*l, p)?;
                if (p.property == "ML_ACCESS" || p.property == "ML_EGRESS")
                    && value == Value::from("all")
                {
                    value = Value::from(1);
                }
                updates.push((*l, p.property.clone(), value));
            }
        }

        if !self.link_attribute_exists("managed") {
            let all: Vec<LinkID> = self.links.keys().cloned().collect();
            for l in all {
                self.set_link_attribute(l, "managed", 0)?;
            }
        }
        for l in links {
            self.set_link_attribute(*l, "managed", 1)?;
        }
        for (l, property, value) in updates {
            self.set_link_attribute(l, &property, value)?;
        }
        info!("Flagged {} links as managed", links.len());
        Ok(())
    }

    fn managed_lane_value(&self, l: LinkID, p: &PropertyChange) -> Result<Value> {
        let base = match (&p.set, &p.change) {
            (Some(x), _) => Some(x.clone()),
            (None, Some(delta)) => Some(self.changed_value(l, &p.property, delta)?),
            (None, None) => None,
        };
        if p.group.is_empty() && p.timeofday.is_empty() {
            return match base {
                Some(x) => Ok(x),
                None => Err(WranglerError::InvalidProperty(format!(
                    "{} needs `set`, `change`, `group`, or `timeofday`",
                    p.property
                ))
                .into()),
            };
        }

        let mut scoped = ScopedValue {
            default: base,
            timeofday: Vec::new(),
        };
        if !p.group.is_empty() {
            for g in &p.group {
                for tod in &g.timeofday {
                    scoped.timeofday.push(ScopedEntry {
                        time: tod.time,
                        category: g.category.clone(),
                        value: self.time_of_day_value(l, &p.property, &tod.set, &tod.change)?,
                    });
                }
            }
        } else {
            for tod in &p.timeofday {
                scoped.timeofday.push(ScopedEntry {
                    time: tod.time,
                    category: Vec::new(),
                    value: self.time_of_day_value(l, &p.property, &tod.set, &tod.change)?,
                });
            }
        }
        Ok(scoped.to_value())
    }

    fn time_of_day_value(
        &self,
        l: LinkID,
        property: &str,
        set: &Option<Value>,
        change: &Option<Value>,
    ) -> Result<Value> {
        match (set, change) {
            (Some(x), _) => Ok(x.clone()),
            (None, Some(delta)) => self.changed_value(l, property, delta),
            (None, None) => Err(WranglerError::InvalidProperty(format!(
                "a time period for {} needs `set` or `change`",
                property
            ))
            .into()),
        }
    }

    fn current_value(&self, l: LinkID, property: &str) -> Option<Value> {
        self.maybe_get_l(l).and_then(|link| link.get(property))
    }

    fn changed_value(&self, l: LinkID, property: &str, delta: &Value) -> Result<Value> {
        let current = match self.current_value(l, property) {
            Some(x) => x,
            None => {
                return Err(WranglerError::InvalidProperty(format!(
                    "can't change {} on {}; it has no value",
                    property, l
                ))
                .into())
            }
        };
        match add_values(&current, delta) {
            Some(x) => Ok(x),
            None => Err(WranglerError::InvalidProperty(format!(
                "can't add {} to {} for {} on {}",
                delta, current, property, l
            ))
            .into()),
        }
    }
}
