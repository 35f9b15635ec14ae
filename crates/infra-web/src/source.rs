// Configured Source - JobSource driven entirely by a SourceSpec

use crate::extract::{extract_html, extract_json, CompiledHtmlSchema};
use crate::http::fetch_text;
use crate::source_spec::{SourceFormat, SourceSpec, SourceSpecError};
use async_trait::async_trait;
use jobsync_core::domain::{EmploymentType, RawListing};
use jobsync_core::port::{FetchError, JobSource};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

pub struct ConfiguredSource {
    spec: SourceSpec,
    client: reqwest::Client,
    timeout_secs: u64,
    headers: BTreeMap<String, String>,
    html: Option<CompiledHtmlSchema>,
    employment_type: Option<EmploymentType>,
}

impl std::fmt::Debug for ConfiguredSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredSource")
            .field("name", &self.spec.name)
            .field("format", &self.spec.format)
            .finish()
    }
}

impl ConfiguredSource {
    /// Validate the spec and prepare everything that can fail before the first fetch
    pub fn new(
        spec: SourceSpec,
        client: reqwest::Client,
        timeout_secs: u64,
    ) -> Result<Self, SourceSpecError> {
        spec.validate()?;
        let headers = spec.resolved_headers()?;
        let html = match spec.format {
            SourceFormat::Html => Some(CompiledHtmlSchema::compile(&spec.schema)?),
            SourceFormat::Json => None,
        };
        let employment_type = spec
            .employment_type
            .as_deref()
            .and_then(EmploymentType::from_text);

        Ok(Self {
            spec,
            client,
            timeout_secs,
            headers,
            html,
            employment_type,
        })
    }

    /// Parse a response body the way `fetch` would (no network)
    pub fn parse(&self, body: &str, request_url: &str) -> Result<Vec<RawListing>, FetchError> {
        let base = Url::parse(request_url).ok();
        match &self.html {
            Some(schema) => Ok(extract_html(body, schema, base.as_ref())),
            None => extract_json(body, &self.spec.schema, base.as_ref()),
        }
    }
}

#[async_trait]
impl JobSource for ConfiguredSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn queries(&self) -> Vec<String> {
        self.spec.effective_queries()
    }

    fn default_employment_type(&self) -> Option<EmploymentType> {
        self.employment_type
    }

    fn category(&self) -> Option<&str> {
        self.spec.category.as_deref()
    }

    async fn fetch(&self, query: &str) -> Result<Vec<RawListing>, FetchError> {
        let url = self.spec.url_for(query);
        let body = fetch_text(&self.client, &url, &self.headers, self.timeout_secs).await?;
        let listings = self.parse(&body, &url)?;
        debug!(
            source = %self.spec.name,
            query = %query,
            listings = listings.len(),
            "Fetched listings"
        );
        Ok(listings)
    }
}
