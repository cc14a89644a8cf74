//! Properties that vary by time of day and traveler category.
//!
//! A scoped property is stored as `{"default": v, "timeofday": [{"time": [start, end],
//! "category": [...], "value": v}, ...]}`. Plain values aren't scoped and always resolve to
//! themselves.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{LinkID, Network};

/// A span of the day in seconds after midnight. `end` may be smaller than `start` for spans
/// crossing midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpan {
    pub start: u32,
    pub end: u32,
}

const DAY: u32 = 24 * 3600;

/// Parses `HH:MM` or `HH:MM:SS` into seconds after midnight. Hours up to 24 are allowed.
pub fn parse_time(x: &str) -> Result<u32> {
    let parts: Vec<&str> = x.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        bail!("time {} isn't HH:MM or HH:MM:SS", x);
    }
    let mut seconds = 0;
    for (idx, part) in parts.iter().enumerate() {
        let value: u32 = part
            .parse()
            .with_context(|| format!("time {} isn't HH:MM or HH:MM:SS", x))?;
        if idx > 0 && value >= 60 {
            bail!("time {} has a field past 59", x);
        }
        seconds += value * [3600, 60, 1][idx];
    }
    if seconds > DAY {
        bail!("time {} is past the end of the day", x);
    }
    Ok(seconds)
}

fn format_time(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if s == 0 {
        format!("{:02}:{:02}", h, m)
    } else {
        format!("{:02}:{:02}:{:02}", h, m, s)
    }
}

impl TimeSpan {
    pub fn parse(start: &str, end: &str) -> Result<TimeSpan> {
        Ok(TimeSpan {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    /// Accepts `["06:00", "09:00"]` or `[21600, 32400]`.
    pub fn from_value(value: &Value) -> Result<TimeSpan> {
        let pair = match value.as_array() {
            Some(x) if x.len() == 2 => x,
            _ => bail!("time span {} should be [start, end]", value),
        };
        let mut times = Vec::new();
        for x in pair {
            times.push(match x {
                Value::String(s) => parse_time(s)?,
                Value::Number(n) => match n.as_u64() {
                    Some(secs) if secs <= DAY as u64 => secs as u32,
                    _ => bail!("time {} isn't a number of seconds in a day", n),
                },
                _ => bail!("time {} should be a string or number of seconds", x),
            });
        }
        Ok(TimeSpan {
            start: times[0],
            end: times[1],
        })
    }

    /// Seconds of the day covered, as half-open `[start, end)` intervals.
    fn intervals(self) -> Vec<(u32, u32)> {
        if self.start <= self.end {
            vec![(self.start, self.end)]
        } else {
            vec![(self.start, DAY), (0, self.end)]
        }
    }

    pub fn duration(self) -> u32 {
        self.intervals().into_iter().map(|(s, e)| e - s).sum()
    }

    pub fn overlap(self, other: TimeSpan) -> u32 {
        let mut total = 0;
        for (s1, e1) in self.intervals() {
            for (s2, e2) in other.intervals() {
                let (s, e) = (s1.max(s2), e1.min(e2));
                if e > s {
                    total += e - s;
                }
            }
        }
        total
    }

    /// Does this span entirely cover `other`?
    pub fn contains(self, other: TimeSpan) -> bool {
        self.overlap(other) == other.duration()
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", format_time(self.start), format_time(self.end))
    }
}

impl Serialize for TimeSpan {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        [format_time(self.start), format_time(self.end)].serialize(s)
    }
}

impl<'de> Deserialize<'de> for TimeSpan {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<TimeSpan, D::Error> {
        let value = Value::deserialize(d)?;
        TimeSpan::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopedEntry {
    pub time: TimeSpan,
    /// Empty means every category.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub category: Vec<String>,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub timeofday: Vec<ScopedEntry>,
}

pub(crate) fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(x) => vec![x],
        OneOrMany::Many(x) => x,
    })
}

impl ScopedValue {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Picks the value for a time span and categories. The first entry whose time covers the span
    /// and whose categories (if any) include one asked for wins; otherwise, the default.
    pub fn resolve(&self, span: Option<TimeSpan>, categories: &[&str]) -> Result<Value> {
        if let Some(span) = span {
            for entry in &self.timeofday {
                if entry.time.contains(span) {
                    if entry.category.is_empty()
                        || entry
                            .category
                            .iter()
                            .any(|c| categories.iter().any(|x| x.eq_ignore_ascii_case(c)))
                    {
                        return Ok(entry.value.clone());
                    }
                } else if entry.time.overlap(span) > 0 {
                    debug!(
                        "Time span {} only partly overlaps {}; ignoring that value",
                        span, entry.time
                    );
                }
            }
        }
        match self.default {
            Some(ref x) => Ok(x.clone()),
            None => bail!("no default value, and nothing matched the time and category"),
        }
    }
}

/// Resolves a stored property value. Anything that isn't a scoped object resolves to itself.
pub fn resolve_value(value: &Value, span: Option<TimeSpan>, categories: &[&str]) -> Result<Value> {
    if !categories.is_empty() && span.is_none() {
        bail!("a category needs a time period too");
    }
    if !value.is_object() {
        return Ok(value.clone());
    }
    match serde_json::from_value::<ScopedValue>(value.clone()) {
        Ok(scoped) => scoped.resolve(span, categories),
        Err(_) => Ok(value.clone()),
    }
}

impl Network {
    /// The value of a link property for a time period and categories, on every link. If the
    /// property doesn't exist, every link gets `default_return`.
    pub fn get_property_by_time_period_and_group(
        &self,
        property: &str,
        time_period: Option<(&str, &str)>,
        categories: &[&str],
        default_return: Option<Value>,
    ) -> Result<BTreeMap<LinkID, Value>> {
        let span = match time_period {
            Some((start, end)) => Some(TimeSpan::parse(start, end)?),
            None => None,
        };
        if !self.link_attribute_exists(property) {
            warn!("No links have {}; using the default for all of them", property);
            let fallback = default_return.unwrap_or(Value::Null);
            return Ok(self.links.keys().map(|l| (*l, fallback.clone())).collect());
        }
        let mut result = BTreeMap::new();
        for link in self.links.values() {
            let value = match link.get(property) {
                Some(x) => resolve_value(&x, span, categories)
                    .with_context(|| format!("{} on {}", property, link.id))?,
                None => Value::Null,
            };
            result.insert(link.id, value);
        }
        Ok(result)
    }
}
