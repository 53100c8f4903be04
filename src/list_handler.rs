//! Default [`Handler`] backed by a sorted OID table.

use crate::error::Result;
use crate::handler::Handler;
use crate::oid::{lower_bound, Oid};
use crate::value::Value;

/// A handler serving a fixed set of OIDs from a sorted table.
///
/// `oids[i]` is kept strictly ascending with `values[i]` as the parallel
/// value slot, so lookups are a single binary search.
///
/// # Example
///
/// ```
/// use async_agentx::{ListHandler, Value};
///
/// let mut handler = ListHandler::new();
/// *handler.add("1.3.6.1.4.1.45995.3.1").unwrap() = Value::octet_string("test");
/// *handler.add("1.3.6.1.4.1.45995.3.3").unwrap() = Value::Integer(42);
/// ```
#[derive(Debug, Default)]
pub struct ListHandler {
    oids: Vec<Oid>,
    values: Vec<Value>,
}

impl ListHandler {
    /// Create an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `oid` into the table and return its value slot, initially
    /// [`Value::Null`]. Adding an OID twice returns the existing slot,
    /// reset to null.
    pub fn add(&mut self, oid: &str) -> Result<&mut Value> {
        let parsed = Oid::parse(oid)?;
        let index = lower_bound(&self.oids, &parsed, true);
        if self.oids.get(index) == Some(&parsed) {
            self.values[index] = Value::Null;
        } else {
            self.oids.insert(index, parsed);
            self.values.insert(index, Value::Null);
        }
        Ok(&mut self.values[index])
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.oids.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}

impl Handler for ListHandler {
    fn get(&self, oid: &Oid) -> Result<Option<(Oid, Value)>> {
        let index = lower_bound(&self.oids, oid, true);
        if self.oids.get(index) == Some(oid) {
            Ok(Some((oid.clone(), self.values[index].clone())))
        } else {
            Ok(None)
        }
    }

    fn get_next(&self, from: &Oid, include_from: bool, to: &Oid) -> Result<Option<(Oid, Value)>> {
        let index = lower_bound(&self.oids, from, include_from);
        match self.oids.get(index) {
            Some(oid) if to.is_empty() || oid < to => {
                Ok(Some((oid.clone(), self.values[index].clone())))
            }
            _ => Ok(None),
        }
    }
}
