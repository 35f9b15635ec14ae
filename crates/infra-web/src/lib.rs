// jobsync Infrastructure - Web Adapter
// Implements: JobSource (schema-driven HTML/JSON), NetworkProbe

mod extract;
mod http;
mod probe;
mod schema;
mod source;
mod source_spec;

pub mod presets;

pub use extract::{extract_html, extract_json, CompiledHtmlSchema};
pub use http::{build_client, fetch_text, HttpConfig};
pub use probe::{HealthConfig, HttpNetworkProbe};
pub use schema::{apply_transforms, ExtractionSchema, FieldRule, Transform};
pub use source::ConfiguredSource;
pub use source_spec::{SourceFormat, SourceSpec, SourceSpecError, QUERY_PLACEHOLDER};

use jobsync_core::application::SourceRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry built from specs, plus the specs that had to be disabled
pub struct LoadedSources {
    pub registry: SourceRegistry,
    pub rejected: Vec<(String, SourceSpecError)>,
}

/// Turn specs into sources; an invalid spec disables only itself
///
/// Disabled specs are skipped silently. Duplicate names keep the first one.
pub fn load_sources(
    specs: Vec<SourceSpec>,
    client: &reqwest::Client,
    timeout_secs: u64,
) -> LoadedSources {
    let mut registry = SourceRegistry::new();
    let mut rejected = Vec::new();

    for spec in specs.into_iter().filter(|s| s.enabled) {
        let name = spec.name.clone();
        match ConfiguredSource::new(spec, client.clone(), timeout_secs) {
            Ok(source) => {
                registry.register(Arc::new(source));
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source disabled: invalid spec");
                rejected.push((name, e));
            }
        }
    }

    info!(
        sources = ?registry.names(),
        rejected = rejected.len(),
        "Sources loaded"
    );

    LoadedSources { registry, rejected }
}
