//! `.json` fact files

use super::{has_extension, ExternalFactError, ExternalResolver};
use crate::facts::{Collection, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

pub struct JsonResolver;

impl ExternalResolver for JsonResolver {
    fn name(&self) -> &'static str {
        "json"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError> {
        let content = fs::read_to_string(path).map_err(|e| ExternalFactError::io(path, e))?;
        let document: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ExternalFactError::parse(path, e))?;
        add_document(path, document, facts)
    }
}

/// Adds each member of a top-level object as a fact.
pub(crate) fn add_document(
    path: &Path,
    document: serde_json::Value,
    facts: &mut Collection,
) -> Result<(), ExternalFactError> {
    let serde_json::Value::Object(members) = document else {
        return Err(ExternalFactError::parse(
            path,
            "expected an object at the top level",
        ));
    };

    for (key, value) in members {
        match Value::from_document(value) {
            Some(value) => facts.add(key.to_lowercase(), value),
            None => debug!("{}: {key} is null and was skipped", path.display()),
        }
    }
    Ok(())
}
