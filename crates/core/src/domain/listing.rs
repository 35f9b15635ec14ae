// Raw Listing - what a source extracts before normalization

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of one extracted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// One listing as extracted from a source page or API response
///
/// Field names follow the canonical vocabulary (`title`, `company`, `skills`, ...)
/// so normalization does not need to know which source produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    /// Position of the listing on its page (0-based)
    pub position: usize,
    fields: BTreeMap<String, FieldValue>,
}

impl RawListing {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style text field (blank values are dropped)
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_text(name, value);
        self
    }

    pub fn with_list(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.set_list(name, values);
        self
    }

    pub fn set_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.insert(name.into(), FieldValue::Text(value));
        }
    }

    pub fn set_list(&mut self, name: impl Into<String>, values: Vec<String>) {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.fields.insert(name.into(), FieldValue::List(values));
        }
    }

    /// Text value of a field; a list field yields its entries joined by ", "
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::List(items) => Some(items.join(", ")),
        }
    }

    /// List value of a field; a text field is split on commas
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(FieldValue::List(items)) => items.clone(),
            Some(FieldValue::Text(s)) => s
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
