//! Declarative field-extraction schema
//!
//! A schema names where the listings live (`items`) and how to pull each
//! canonical field out of one listing (`fields`). For HTML sources paths are
//! CSS selectors; for JSON sources they are JSON pointers (RFC 6901) relative
//! to the item. Each field can run a chain of transforms over its raw values.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    /// CSS selector (HTML) or JSON pointer (JSON) to the listing elements.
    /// An empty pointer means the response body itself is the array.
    pub items: String,
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Canonical field name (`title`, `company`, `skills`, ...)
    pub name: String,
    /// Selector/pointer relative to the item; empty means the item itself
    #[serde(default)]
    pub path: String,
    /// HTML only: read this attribute instead of the text content
    #[serde(default)]
    pub attr: Option<String>,
    #[serde(default)]
    pub transform: Vec<Transform>,
    /// Keep every value instead of the first one
    #[serde(default)]
    pub list: bool,
}

impl FieldRule {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            attr: None,
            transform: Vec::new(),
            list: false,
        }
    }

    pub fn attr(mut self, attr: &str) -> Self {
        self.attr = Some(attr.to_string());
        self
    }

    pub fn transform(mut self, transforms: &[Transform]) -> Self {
        self.transform = transforms.to_vec();
        self
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    CollapseWhitespace,
    Lowercase,
    /// Resolve relative links against the request URL
    AbsoluteUrl,
    /// One value becomes many, split on commas
    SplitComma,
    /// Drop markup, keep text
    StripHtml,
}

impl Transform {
    fn apply(&self, values: Vec<String>, base_url: Option<&Url>) -> Vec<String> {
        match self {
            Transform::Trim => values.into_iter().map(|v| v.trim().to_string()).collect(),
            Transform::CollapseWhitespace => values
                .into_iter()
                .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect(),
            Transform::Lowercase => values.into_iter().map(|v| v.to_lowercase()).collect(),
            Transform::AbsoluteUrl => values
                .into_iter()
                .map(|v| match base_url.and_then(|base| base.join(v.trim()).ok()) {
                    Some(url) => url.to_string(),
                    None => v,
                })
                .collect(),
            Transform::SplitComma => values
                .iter()
                .flat_map(|v| v.split(','))
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            Transform::StripHtml => values.into_iter().map(|v| strip_html(&v)).collect(),
        }
    }
}

/// Run `transforms` in order and drop values that end up blank
pub fn apply_transforms(
    values: Vec<String>,
    transforms: &[Transform],
    base_url: Option<&Url>,
) -> Vec<String> {
    transforms
        .iter()
        .fold(values, |values, t| t.apply(values, base_url))
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect()
}

fn strip_html(s: &str) -> String {
    let fragment = scraper::Html::parse_fragment(s);
    fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
