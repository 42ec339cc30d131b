//! `.txt` fact files: one `key=value` per line

use super::{add_key_value_lines, has_extension, ExternalFactError, ExternalResolver};
use crate::facts::Collection;
use std::fs;
use std::path::Path;

pub struct TextResolver;

impl ExternalResolver for TextResolver {
    fn name(&self) -> &'static str {
        "text"
    }

    fn can_resolve(&self, path: &Path) -> bool {
        has_extension(path, &["txt"])
    }

    fn resolve(&self, path: &Path, facts: &mut Collection) -> Result<(), ExternalFactError> {
        let content = fs::read_to_string(path).map_err(|e| ExternalFactError::io(path, e))?;
        add_key_value_lines(path, content.lines(), facts);
        Ok(())
    }
}
