use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use crate::WranglerError;

/// Hands out new IDs derived from existing ones, refusing anything already in use.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    kind: &'static str,
    used: BTreeSet<i64>,
    /// Original ID to the ID derived from it, so asking twice gives the same answer.
    derived: BTreeMap<i64, i64>,
}

impl IdAllocator {
    pub fn new<I: IntoIterator<Item = i64>>(kind: &'static str, existing: I) -> IdAllocator {
        IdAllocator {
            kind,
            used: existing.into_iter().collect(),
            derived: BTreeMap::new(),
        }
    }

    /// `original + scalar`. Deriving from the same original again returns the same ID.
    pub fn derive(&mut self, original: i64, scalar: i64) -> Result<i64> {
        if let Some(id) = self.derived.get(&original) {
            return Ok(*id);
        }
        let id = match original.checked_add(scalar) {
            Some(x) => x,
            None => {
                return Err(WranglerError::IdCollision(format!(
                    "{} {} + {} overflows",
                    self.kind, original, scalar
                ))
                .into())
            }
        };
        self.claim(id)?;
        self.derived.insert(original, id);
        Ok(id)
    }

    /// Marks an exact ID as used. Fails if it already is.
    pub fn claim(&mut self, id: i64) -> Result<i64> {
        if !self.used.insert(id) {
            return Err(WranglerError::IdCollision(format!(
                "{} {} is already in use",
                self.kind, id
            ))
            .into());
        }
        Ok(id)
    }

    /// Adds several IDs, failing on overflow.
    pub fn claim_sum(&mut self, parts: &[i64]) -> Result<i64> {
        let mut total: i64 = 0;
        for x in parts {
            total = match total.checked_add(*x) {
                Some(t) => t,
                None => {
                    return Err(WranglerError::IdCollision(format!(
                        "{} {:?} overflows",
                        self.kind, parts
                    ))
                    .into())
                }
            };
        }
        self.claim(total)
    }
}
