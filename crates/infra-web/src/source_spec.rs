// Source Spec - declarative configuration of one job source

use crate::schema::ExtractionSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Placeholder in `url_template` replaced by the URL-encoded query
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// A spec that cannot be turned into a working source (disables only that source)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceSpecError {
    #[error("source name must not be empty")]
    EmptyName,

    #[error("invalid URL template '{0}'")]
    InvalidUrl(String),

    #[error("invalid selector for '{field}' ({selector}): {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("invalid JSON pointer for '{field}': '{pointer}' must be empty or start with '/'")]
    InvalidPointer { field: String, pointer: String },

    #[error("schema has no '{0}' field")]
    MissingField(&'static str),

    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Html,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub format: SourceFormat,
    /// Request URL; `{query}` is substituted per query
    pub url_template: String,
    /// Search keywords; a template without `{query}` is fetched once
    #[serde(default)]
    pub queries: Vec<String>,
    /// Extra request headers; values may reference `${ENV_VAR}`
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub schema: ExtractionSchema,
}

fn default_enabled() -> bool {
    true
}

impl SourceSpec {
    /// Checks that do not need the HTML selector engine
    pub fn validate(&self) -> Result<(), SourceSpecError> {
        if self.name.trim().is_empty() {
            return Err(SourceSpecError::EmptyName);
        }

        let probe = self.url_template.replace(QUERY_PLACEHOLDER, "probe");
        url::Url::parse(&probe)
            .map_err(|_| SourceSpecError::InvalidUrl(self.url_template.clone()))?;

        for required in ["title", "company"] {
            if !self.schema.fields.iter().any(|f| f.name == required) {
                return Err(SourceSpecError::MissingField(required));
            }
        }

        if self.format == SourceFormat::Json {
            let pointers = std::iter::once(("items", &self.schema.items))
                .chain(self.schema.fields.iter().map(|f| (f.name.as_str(), &f.path)));
            for (field, pointer) in pointers {
                if !pointer.is_empty() && !pointer.starts_with('/') {
                    return Err(SourceSpecError::InvalidPointer {
                        field: field.to_string(),
                        pointer: pointer.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Queries to fetch; a single empty query when none are configured
    pub fn effective_queries(&self) -> Vec<String> {
        if self.queries.is_empty() {
            vec![String::new()]
        } else {
            self.queries.clone()
        }
    }

    pub fn url_for(&self, query: &str) -> String {
        self.url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
    }

    /// Header values with `${VAR}` references resolved from the environment
    pub fn resolved_headers(&self) -> Result<BTreeMap<String, String>, SourceSpecError> {
        self.headers
            .iter()
            .map(|(name, value)| Ok((name.clone(), expand_env(value)?)))
            .collect()
    }
}

fn expand_env(value: &str) -> Result<String, SourceSpecError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let var = &after[..end];
        let resolved =
            std::env::var(var).map_err(|_| SourceSpecError::MissingEnv(var.to_string()))?;
        out.push_str(&resolved);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
