// Schema-driven extraction: response body -> RawListing
//
// Pure functions over the body text so every source can be tested against
// canned fixtures. A listing that yields no fields at all is dropped here;
// one missing required fields is rejected later by normalization.

use crate::schema::{apply_transforms, ExtractionSchema, FieldRule};
use crate::source_spec::SourceSpecError;
use jobsync_core::domain::RawListing;
use jobsync_core::port::FetchError;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

/// HTML schema with every selector parsed up front
#[derive(Debug)]
pub struct CompiledHtmlSchema {
    items: Selector,
    fields: Vec<(FieldRule, Option<Selector>)>,
}

impl CompiledHtmlSchema {
    pub fn compile(schema: &ExtractionSchema) -> Result<Self, SourceSpecError> {
        let items = parse_selector("items", &schema.items)?;
        let fields = schema
            .fields
            .iter()
            .map(|rule| {
                let selector = if rule.path.trim().is_empty() {
                    None
                } else {
                    Some(parse_selector(&rule.name, &rule.path)?)
                };
                Ok((rule.clone(), selector))
            })
            .collect::<Result<Vec<_>, SourceSpecError>>()?;

        Ok(Self { items, fields })
    }
}

fn parse_selector(field: &str, selector: &str) -> Result<Selector, SourceSpecError> {
    Selector::parse(selector).map_err(|e| SourceSpecError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub fn extract_html(
    body: &str,
    schema: &CompiledHtmlSchema,
    base_url: Option<&Url>,
) -> Vec<RawListing> {
    let document = Html::parse_document(body);

    document
        .select(&schema.items)
        .enumerate()
        .map(|(position, item)| {
            let mut raw = RawListing::new(position);
            for (rule, selector) in &schema.fields {
                let values: Vec<String> = match selector {
                    Some(selector) => item
                        .select(selector)
                        .filter_map(|el| element_value(el, rule.attr.as_deref()))
                        .collect(),
                    None => element_value(item, rule.attr.as_deref())
                        .into_iter()
                        .collect(),
                };
                assign(
                    &mut raw,
                    rule,
                    apply_transforms(values, &rule.transform, base_url),
                );
            }
            raw
        })
        .filter(|raw| !raw.is_empty())
        .collect()
}

fn element_value(el: ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    match attr {
        Some(attr) => el.value().attr(attr).map(str::to_string),
        None => Some(el.text().collect::<Vec<_>>().join(" ")),
    }
}

/// # Errors
/// `FetchError::Parse` when the body is not JSON or `items` does not point at an array
pub fn extract_json(
    body: &str,
    schema: &ExtractionSchema,
    base_url: Option<&Url>,
) -> Result<Vec<RawListing>, FetchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Parse(format!("invalid JSON: {}", e)))?;

    let items = root
        .pointer(&schema.items)
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse(format!("no array at '{}'", schema.items)))?;

    Ok(items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let mut raw = RawListing::new(position);
            for rule in &schema.fields {
                let values = item.pointer(&rule.path).map(json_values).unwrap_or_default();
                assign(
                    &mut raw,
                    rule,
                    apply_transforms(values, &rule.transform, base_url),
                );
            }
            raw
        })
        .filter(|raw| !raw.is_empty())
        .collect())
}

fn json_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(json_values).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// First rule that yields a value for a field wins, so later rules act as fallbacks
fn assign(raw: &mut RawListing, rule: &FieldRule, values: Vec<String>) {
    if values.is_empty() {
        return;
    }
    if rule.list {
        if raw.list(&rule.name).is_empty() {
            raw.set_list(rule.name.as_str(), values);
        }
    } else if raw.text(&rule.name).is_none() {
        if let Some(first) = values.into_iter().next() {
            raw.set_text(rule.name.as_str(), first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Transform;

    const BOARD_HTML: &str = r#"
        <html><body>
          <div class="job">
            <h2 class="title"> Backend   Intern </h2>
            <span class="company">Acme</span>
            <a class="apply" href="/jobs/42">Apply</a>
            <ul class="tags"><li>Rust</li><li>SQL</li></ul>
          </div>
          <div class="job">
            <h2 class="title">Data Intern</h2>
            <a class="apply" href="https://other.example/7">Apply</a>
          </div>
          <div class="job"></div>
        </body></html>
    "#;

    fn board_schema() -> ExtractionSchema {
        ExtractionSchema {
            items: "div.job".to_string(),
            fields: vec![
                FieldRule::new("title", ".title").transform(&[Transform::CollapseWhitespace]),
                FieldRule::new("company", ".company").transform(&[Transform::Trim]),
                FieldRule::new("url", "a.apply")
                    .attr("href")
                    .transform(&[Transform::AbsoluteUrl]),
                FieldRule::new("skills", ".tags li").list(),
            ],
        }
    }

    #[test]
    fn test_html_extraction_keeps_partial_listings_and_drops_empty_ones() {
        let schema = CompiledHtmlSchema::compile(&board_schema()).unwrap();
        let base = Url::parse("https://board.example/search").unwrap();

        let listings = extract_html(BOARD_HTML, &schema, Some(&base));

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].text("title").as_deref(), Some("Backend Intern"));
        assert_eq!(listings[0].text("company").as_deref(), Some("Acme"));
        assert_eq!(
            listings[0].text("url").as_deref(),
            Some("https://board.example/jobs/42")
        );
        assert_eq!(listings[0].list("skills"), vec!["Rust", "SQL"]);
        // Missing company is left for normalization to reject
        assert_eq!(listings[1].position, 1);
        assert_eq!(listings[1].text("company"), None);
    }

    #[test]
    fn test_invalid_selector_is_a_spec_error() {
        let schema = ExtractionSchema {
            items: "div..job".to_string(),
            fields: vec![],
        };
        let err = CompiledHtmlSchema::compile(&schema).unwrap_err();
        assert!(matches!(err, SourceSpecError::InvalidSelector { .. }));
    }

    #[test]
    fn test_json_extraction_with_fallback_fields() {
        let body = r#"{
            "jobs": [
                { "id": 101, "title": "SRE Intern", "company_name": "Globex",
                  "tags": ["k8s", "linux"], "description": "<p>Keep <b>things</b> up</p>" },
                { "id": 102, "title": "QA", "company": "Initech" },
                { "unrelated": true }
            ]
        }"#;
        let schema = ExtractionSchema {
            items: "/jobs".to_string(),
            fields: vec![
                FieldRule::new("id", "/id"),
                FieldRule::new("title", "/title"),
                FieldRule::new("company", "/company_name"),
                FieldRule::new("company", "/company"),
                FieldRule::new("skills", "/tags").list(),
                FieldRule::new("description", "/description").transform(&[Transform::StripHtml]),
            ],
        };

        let listings = extract_json(body, &schema, None).unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].text("id").as_deref(), Some("101"));
        assert_eq!(listings[0].text("company").as_deref(), Some("Globex"));
        assert_eq!(listings[0].list("skills"), vec!["k8s", "linux"]);
        assert_eq!(
            listings[0].text("description").as_deref(),
            Some("Keep things up")
        );
        assert_eq!(listings[1].text("company").as_deref(), Some("Initech"));
    }

    #[test]
    fn test_json_root_array_and_bad_pointer() {
        let schema = ExtractionSchema {
            items: String::new(),
            fields: vec![FieldRule::new("title", "/t")],
        };
        let listings = extract_json(r#"[{"t": "A"}, {"t": "B"}]"#, &schema, None).unwrap();
        assert_eq!(listings.len(), 2);

        let missing = ExtractionSchema {
            items: "/data".to_string(),
            fields: vec![],
        };
        let err = extract_json(r#"{"jobs": []}"#, &missing, None).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = extract_json("<html>", &missing, None).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
