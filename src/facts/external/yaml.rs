//! `.yaml` / `.yml` fact files

use super::json::add_document;
use super::{has_extension, ExternalFactError, ExternalResolver};
use crate::facts::Collection;
use std::fs;
use std::path::Path;

pub struct YamlResolver;

impl ExternalResolver for YamlResolver {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        has_extension(path, &["yaml", "yml"])
    }

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError> {
        let content = fs::read_to_string(path).map_err(|e| ExternalFactError::io(path, e))?;
        let document: serde_json::Value =
            serde_yaml::from_str(&content).map_err(|e| ExternalFactError::parse(path, e))?;
        add_document(path, document, facts)
    }
}
