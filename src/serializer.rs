//! Serialization of generated documents to JSON or YAML.
//!
//! Works for any `Serialize` document, so collections and environments share the same
//! output path.

use crate::error::{Error, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML.
///
/// # Errors
///
/// Returns [`Error::SerializationError`] if the document cannot be represented.
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes a document to JSON, pretty-printed with two-space indentation.
///
/// # Example
///
/// ```
/// use postman_from_source::environment::build_environment;
/// use postman_from_source::serializer::serialize_json;
///
/// let env = build_environment("Local", "http://localhost:8080");
/// let json = serialize_json(&env).unwrap();
/// assert!(json.contains("\n  \"name\": \"Local\""));
/// ```
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    fs::write(path, content)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
