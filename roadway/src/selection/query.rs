use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::objects::attributes::{as_text, is_truthy, values_equal};
use crate::{Link, Mode, WranglerError};

/// Describes which links a project applies to. Each entry of `link` is a set of
/// `{attribute: value}` clauses. `A` and `B`, if present, name the endpoint nodes of the facility
/// with a single `{unique node field: value}` pair each.
///
/// A list value matches any of its elements; string elements match by substring, others by
/// equality. A scalar value matches by equality.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacilitySelection {
    pub link: Vec<BTreeMap<String, Value>>,
    #[serde(rename = "A", default, skip_serializing_if = "Option::is_none")]
    pub a: Option<BTreeMap<String, Value>>,
    #[serde(rename = "B", default, skip_serializing_if = "Option::is_none")]
    pub b: Option<BTreeMap<String, Value>>,
}

impl FacilitySelection {
    pub fn from_value(value: Value) -> Result<FacilitySelection> {
        serde_json::from_value(value).map_err(|err| {
            WranglerError::SelectionFormat(format!("can't parse facility: {}", err)).into()
        })
    }

    /// Every `(attribute, value)` clause across all link entries, in order.
    pub fn link_clauses(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.link.iter().flat_map(|entry| entry.iter())
    }

    pub fn link_fields(&self) -> BTreeSet<&str> {
        self.link_clauses().map(|(k, _)| k.as_str()).collect()
    }

    /// The number of link clauses. The post-search re-filter only runs with more than one.
    pub fn num_link_clauses(&self) -> usize {
        self.link_clauses().count()
    }

    pub fn uses_unique_link_id<S: AsRef<str>>(&self, unique_link_ids: &[S]) -> bool {
        unique_link_ids
            .iter()
            .any(|id| self.link_fields().contains(id.as_ref()))
    }
}

/// A boolean condition over a record's attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Equals { field: String, value: Value },
    /// Matches if any value does. Strings match by substring.
    AnyOf { field: String, values: Vec<Value> },
    /// Matches if any of these flag attributes is truthy.
    AnyTruthy(Vec<String>),
    All(Vec<Predicate>),
}

impl Predicate {
    /// Turns the link clauses of a selection into one predicate. Clauses on fields in `ignore`
    /// are dropped. If `mode` is set, the mode's access flags are also required.
    pub fn for_links(sel: &FacilitySelection, mode: Option<Mode>, ignore: &[&str]) -> Predicate {
        Predicate::from_clauses(sel.link_clauses(), mode, ignore)
    }

    /// Like `for_links`, but only keeps clauses on unique link ID fields, and never filters by
    /// mode.
    pub fn for_unique_links<S: AsRef<str>>(sel: &FacilitySelection, unique_link_ids: &[S]) -> Predicate {
        let unique: BTreeSet<&str> = unique_link_ids.iter().map(|x| x.as_ref()).collect();
        Predicate::from_clauses(
            sel.link_clauses().filter(|(k, _)| unique.contains(k.as_str())),
            None,
            &[],
        )
    }

    fn from_clauses<'a, I: Iterator<Item = (&'a String, &'a Value)>>(
        clauses: I,
        mode: Option<Mode>,
        ignore: &[&str],
    ) -> Predicate {
        let mut all = Vec::new();
        for (field, value) in clauses {
            if ignore.contains(&field.as_str()) {
                continue;
            }
            all.push(match value {
                Value::Array(values) => Predicate::AnyOf {
                    field: field.clone(),
                    values: values.clone(),
                },
                _ => Predicate::Equals {
                    field: field.clone(),
                    value: value.clone(),
                },
            });
        }
        if let Some(mode) = mode {
            all.push(Predicate::AnyTruthy(
                mode.link_variables().iter().map(|x| x.to_string()).collect(),
            ));
        }
        Predicate::All(all)
    }

    /// `lookup` returns the value of a field on the record being tested, if it has one.
    pub fn matches<F: Fn(&str) -> Option<Value>>(&self, lookup: &F) -> bool {
        match self {
            Predicate::Equals { field, value } => lookup(field.as_str())
                .map(|x| values_equal(&x, value))
                .unwrap_or(false),
            Predicate::AnyOf { field, values } => match lookup(field.as_str()) {
                Some(x) => values.iter().any(|v| match v {
                    Value::String(needle) => as_text(&x).contains(needle.as_str()),
                    _ => values_equal(&x, v),
                }),
                None => false,
            },
            Predicate::AnyTruthy(fields) => fields
                .iter()
                .any(|f| lookup(f.as_str()).map(|x| is_truthy(&x)).unwrap_or(false)),
            Predicate::All(list) => list.iter().all(|p| p.matches(lookup)),
        }
    }

    pub fn matches_link(&self, link: &Link) -> bool {
        let lookup = |field: &str| link.get(field);
        self.matches(&lookup)
    }

    pub fn fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Predicate::Equals { field, .. } | Predicate::AnyOf { field, .. } => {
                fields.insert(field.clone());
            }
            Predicate::AnyTruthy(list) => {
                fields.extend(list.iter().cloned());
            }
            Predicate::All(list) => {
                for p in list {
                    p.collect_fields(fields);
                }
            }
        }
    }

    /// The same condition, but testing `to` wherever it tested `from`.
    pub fn rename_field(&self, from: &str, to: &str) -> Predicate {
        let rename = |field: &String| {
            if field == from {
                to.to_string()
            } else {
                field.clone()
            }
        };
        match self {
            Predicate::Equals { field, value } => Predicate::Equals {
                field: rename(field),
                value: value.clone(),
            },
            Predicate::AnyOf { field, values } => Predicate::AnyOf {
                field: rename(field),
                values: values.clone(),
            },
            Predicate::AnyTruthy(list) => Predicate::AnyTruthy(list.iter().map(rename).collect()),
            Predicate::All(list) => {
                Predicate::All(list.iter().map(|p| p.rename_field(from, to)).collect())
            }
        }
    }
}

/// A canonical form, used as the selection cache key. Logically equal selections built from
/// the same clauses print the same way.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::Equals { field, value } => write!(f, "{} == {}", field, value),
            Predicate::AnyOf { field, values } => {
                write!(f, "{} in [", field)?;
                for (idx, v) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Predicate::AnyTruthy(list) => write!(f, "any_set({})", list.join(", ")),
            Predicate::All(list) => {
                let mut parts: Vec<String> = list.iter().map(|p| format!("({})", p)).collect();
                parts.sort();
                parts.dedup();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}
