// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-task engine options for `aria2.addUri`.
//!
//! Option names are not validated here. Whatever the caller puts in is sent
//! as-is; an option the engine does not know comes back as an RPC fault.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered option map sent as the third `aria2.addUri` parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOptions(IndexMap<String, OptionValue>);

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace an option. Returns the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Option<OptionValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Insert only when the option is not set yet.
    pub fn insert_default(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    /// Add a value for `name`, turning a repeated name into a list.
    ///
    /// Cumulative engine options such as `header` take a list of strings.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let value = value.into();
        match self.0.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                OptionValue::List(items) => items.push(value),
                existing => {
                    let first = std::mem::replace(existing, OptionValue::List(Vec::new()));
                    *existing = OptionValue::List(vec![first, value]);
                }
            },
        }
    }

    /// Parse a `name=value` assignment as given on the command line.
    ///
    /// The value is kept verbatim as a string; the engine only applies
    /// string option values.
    pub fn parse_assignment(text: &str) -> Result<(String, String), String> {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{}'", text))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing option name in '{}'", text));
        }
        Ok((name.to_string(), value.to_string()))
    }

    /// Build options from parsed assignments; repeated names collect into a
    /// list in the order given.
    pub fn from_assignments<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut options = Self::new();
        for (name, value) in assignments {
            options.append(name, value);
        }
        options
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for TaskOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
