//! Named value bundles passed to and read back from the simulator.

use std::collections::{btree_map, BTreeMap};

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

use crate::error::{Result, WrapError};
use crate::value::Value;

/// Words that cannot be redefined from the command line.
const RESERVED: &[&str] = &[
    "if", "else", "do", "while", "for", "in", "next", "break", "return", "function", "NULL", "T",
    "F", "E", "PI", "INF", "NAN",
];

/// True when `name` can be defined as a constant in the injected code.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name)
}

/// Mapping from identifier to value, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    inner: BTreeMap<String, Value>,
}

/// Values decoded from the simulator's output file.
pub type ResultSet = ParameterSet;

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous one under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(WrapError::serialization(name, "not a valid identifier"));
        }
        self.inner.insert(name, value.into());
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.inner.iter()
    }

    /// Merges `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: ParameterSet) {
        self.inner.extend(other.inner);
    }

    /// Reads a JSON object, converting each member with [`Value::from_json`].
    pub fn from_json(json: &Json) -> Result<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| WrapError::serialization("<root>", "parameters must be a JSON object"))?;
        let mut set = Self::new();
        for (name, v) in obj {
            set.insert(name.clone(), Value::from_json(name, v)?)?;
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Json {
        Json::Object(
            self.inner
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
