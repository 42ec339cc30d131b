//! Rendering a collection for display

use crate::facts::{Collection, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Resolves and renders the queried facts, or every fact when `queries` is
/// empty. Facts that do not resolve are left out, except that a single text
/// query prints an empty line.
pub fn render(
    collection: &mut Collection,
    queries: &[String],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    if queries.is_empty() {
        collection.resolve_all();
        let facts: Vec<(&str, &Value)> = collection.iter().collect();
        return render_facts(&facts, format);
    }

    for query in queries {
        collection.get(query);
    }

    if let ([query], OutputFormat::Text) = (queries, format) {
        let mut out = collection
            .cached(query)
            .map(|value| value.render_text(false))
            .unwrap_or_default();
        out.push('\n');
        return Ok(out);
    }

    let facts: Vec<(&str, &Value)> = queries
        .iter()
        .filter_map(|query| {
            collection
                .cached(query)
                .map(|value| (query.as_str(), value))
        })
        .collect();
    render_facts(&facts, format)
}

fn render_facts(facts: &[(&str, &Value)], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for (name, value) in facts {
                let _ = writeln!(out, "{name} => {}", value.render_text(false));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let document: BTreeMap<&str, &Value> = facts.iter().copied().collect();
            let mut out = serde_json::to_string_pretty(&document)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Yaml => Ok(facts
            .iter()
            .map(|(name, value)| value.render_markup_entry(name))
            .collect()),
    }
}
