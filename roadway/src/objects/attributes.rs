use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every attribute of a node, link, or shape that isn't structural. Networks carry whatever
/// columns their source had, so this is a free-form map rather than fixed fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    pub fn new() -> Attributes {
        Attributes(BTreeMap::new())
    }

    pub fn get(&self, k: &str) -> Option<&Value> {
        self.0.get(k)
    }

    pub fn get_str(&self, k: &str) -> Option<&str> {
        self.0.get(k).and_then(|v| v.as_str())
    }

    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    /// Present and not blank.
    pub fn has(&self, k: &str) -> bool {
        self.0.get(k).map(|v| !is_blank(v)).unwrap_or(false)
    }

    pub fn is_truthy(&self, k: &str) -> bool {
        self.0.get(k).map(is_truthy).unwrap_or(false)
    }

    /// True if any of the keys is truthy.
    pub fn is_any_truthy<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|k| self.is_truthy(k.as_ref()))
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, k: K, v: V) -> Option<Value> {
        self.0.insert(k.into(), v.into())
    }

    pub fn remove(&mut self, k: &str) -> Option<Value> {
        self.0.remove(k)
    }

    pub fn retain<F: FnMut(&String, &mut Value) -> bool>(&mut self, f: F) {
        self.0.retain(f)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for Attributes {
    fn from(map: BTreeMap<String, Value>) -> Attributes {
        Attributes(map)
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Attributes {
        Attributes(iter.into_iter().collect())
    }
}

/// Flags are stored inconsistently across sources: booleans, 0/1, or strings.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "NaN",
        _ => false,
    }
}

/// Equality with numeric coercion, so `2`, `2.0`, and `"2"` all match.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// The text a substring match runs against.
pub fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric addition, used for `change` instructions. Integers stay integers.
pub fn add_values(base: &Value, delta: &Value) -> Option<Value> {
    if let (Some(x), Some(y)) = (base.as_i64(), delta.as_i64()) {
        return Some(Value::from(x + y));
    }
    let sum = as_number(base)? + as_number(delta)?;
    Some(Value::from(sum))
}
