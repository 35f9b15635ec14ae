// Built-in source presets, used when the configuration lists no sources

use crate::schema::{ExtractionSchema, FieldRule, Transform};
use crate::source_spec::{SourceFormat, SourceSpec};
use std::collections::BTreeMap;

pub const DEFAULT_QUERIES: &[&str] = &["software engineer", "data analyst", "web developer"];

pub fn builtin_sources() -> Vec<SourceSpec> {
    vec![
        internship_board(DEFAULT_QUERIES),
        remotive(DEFAULT_QUERIES),
        arbeitnow(),
    ]
}

fn queries(queries: &[&str]) -> Vec<String> {
    queries.iter().map(|q| q.to_string()).collect()
}

/// Server-rendered internship listings (HTML)
pub fn internship_board(search: &[&str]) -> SourceSpec {
    let text = [Transform::CollapseWhitespace];
    SourceSpec {
        name: "internshala".to_string(),
        enabled: true,
        format: SourceFormat::Html,
        url_template: "https://internshala.com/internships/keywords-{query}/".to_string(),
        queries: queries(search),
        headers: BTreeMap::new(),
        employment_type: Some("internship".to_string()),
        category: None,
        schema: ExtractionSchema {
            items: "div.internship_meta".to_string(),
            fields: vec![
                FieldRule::new("title", ".job-internship-name a").transform(&text),
                FieldRule::new("title", ".job-internship-name").transform(&text),
                FieldRule::new("company", ".company-name").transform(&text),
                FieldRule::new("location", ".locations a")
                    .transform(&text)
                    .list(),
                FieldRule::new("salary", ".stipend").transform(&text),
                FieldRule::new("experience", ".duration").transform(&text),
                FieldRule::new("url", ".job-internship-name a")
                    .attr("href")
                    .transform(&[Transform::AbsoluteUrl]),
            ],
        },
    }
}

/// Remotive public API (JSON)
pub fn remotive(search: &[&str]) -> SourceSpec {
    SourceSpec {
        name: "remotive".to_string(),
        enabled: true,
        format: SourceFormat::Json,
        url_template: "https://remotive.com/api/remote-jobs?search={query}&limit=50".to_string(),
        queries: queries(search),
        headers: BTreeMap::new(),
        employment_type: Some("remote".to_string()),
        category: None,
        schema: ExtractionSchema {
            items: "/jobs".to_string(),
            fields: vec![
                FieldRule::new("id", "/id"),
                FieldRule::new("title", "/title"),
                FieldRule::new("company", "/company_name"),
                FieldRule::new("location", "/candidate_required_location"),
                FieldRule::new("employment_type", "/job_type"),
                FieldRule::new("salary", "/salary"),
                FieldRule::new("category", "/category"),
                FieldRule::new("skills", "/tags").list(),
                FieldRule::new("description", "/description")
                    .transform(&[Transform::StripHtml]),
                FieldRule::new("url", "/url"),
            ],
        },
    }
}

/// Arbeitnow job board API (JSON, no search parameter)
pub fn arbeitnow() -> SourceSpec {
    SourceSpec {
        name: "arbeitnow".to_string(),
        enabled: true,
        format: SourceFormat::Json,
        url_template: "https://www.arbeitnow.com/api/job-board-api".to_string(),
        queries: Vec::new(),
        headers: BTreeMap::new(),
        employment_type: None,
        category: None,
        schema: ExtractionSchema {
            items: "/data".to_string(),
            fields: vec![
                FieldRule::new("id", "/slug"),
                FieldRule::new("title", "/title"),
                FieldRule::new("company", "/company_name"),
                FieldRule::new("location", "/location"),
                FieldRule::new("employment_type", "/job_types"),
                FieldRule::new("skills", "/tags").list(),
                FieldRule::new("description", "/description")
                    .transform(&[Transform::StripHtml]),
                FieldRule::new("url", "/url"),
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CompiledHtmlSchema;

    #[test]
    fn test_builtin_presets_are_valid() {
        for spec in builtin_sources() {
            assert_eq!(spec.validate(), Ok(()), "preset {}", spec.name);
            if spec.format == SourceFormat::Html {
                assert!(CompiledHtmlSchema::compile(&spec.schema).is_ok());
            }
        }
    }

    #[test]
    fn test_preset_names_are_unique() {
        let mut names: Vec<_> = builtin_sources().into_iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }
}
