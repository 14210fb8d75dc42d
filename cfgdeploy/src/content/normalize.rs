//! Content normalization
//!
//! Canonicalizes configuration documents so that documents which differ only
//! cosmetically (key order, whitespace, line endings) compare as equal text.
//! Both the diff command and the orchestrator's skip decision go through
//! [`normalize`], so they always agree on what counts as a change.

use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Value as YamlValue;

use crate::content::kind::{ConfigurationProfileKind, FileKind};
use crate::errors::DeployError;

/// Server-assigned fields on feature flag documents
const VOLATILE_KEYS: [&str; 2] = ["_updatedAt", "_createdAt"];

/// Normalize a document into its canonical text form
pub fn normalize(
    content: &[u8],
    kind: FileKind,
    profile_kind: ConfigurationProfileKind,
) -> Result<String, DeployError> {
    match kind {
        FileKind::Json => normalize_json(content, profile_kind),
        FileKind::Yaml => normalize_yaml(content),
        FileKind::Text => Ok(normalize_text(content)),
    }
}

fn normalize_json(
    content: &[u8],
    profile_kind: ConfigurationProfileKind,
) -> Result<String, DeployError> {
    let mut value: Value = serde_json::from_slice(content)
        .map_err(|e| DeployError::InvalidSyntax(format!("invalid JSON: {}", e)))?;

    if profile_kind.strips_timestamps() {
        strip_volatile_keys(&mut value);
    }

    // serde_json's map is ordered by key, so pretty printing is deterministic
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Every document is kept, so an edit to any of them registers as a change.
/// YAML values are not forced through JSON, which has no `.nan` or `.inf`.
fn normalize_yaml(content: &[u8]) -> Result<String, DeployError> {
    let mut documents = Vec::new();
    for mut value in parse_yaml_documents(content)? {
        sort_mapping_keys(&mut value);
        documents.push(serde_yaml::to_string(&value)?);
    }

    Ok(documents.join("---\n"))
}

/// Parse every document in a YAML stream. An empty stream is one null document.
pub(crate) fn parse_yaml_documents(content: &[u8]) -> Result<Vec<YamlValue>, DeployError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(content) {
        let value = YamlValue::deserialize(document)
            .map_err(|e| DeployError::InvalidSyntax(format!("invalid YAML: {}", e)))?;
        documents.push(value);
    }

    if documents.is_empty() {
        documents.push(YamlValue::Null);
    }
    Ok(documents)
}

fn sort_mapping_keys(value: &mut YamlValue) {
    match value {
        YamlValue::Mapping(map) => {
            let mut entries: Vec<(YamlValue, YamlValue)> =
                std::mem::take(map).into_iter().collect();
            entries.sort_by_cached_key(|(key, _)| key_text(key));
            for (key, mut child) in entries {
                sort_mapping_keys(&mut child);
                map.insert(key, child);
            }
        }
        YamlValue::Sequence(items) => {
            for item in items {
                sort_mapping_keys(item);
            }
        }
        YamlValue::Tagged(tagged) => sort_mapping_keys(&mut tagged.value),
        _ => {}
    }
}

fn key_text(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

fn normalize_text(content: &[u8]) -> String {
    let text = String::from_utf8_lossy(content).replace("\r\n", "\n");
    let mut text = text.trim_end_matches('\n').to_string();
    text.push('\n');
    text
}

/// Remove volatile timestamp keys from every object at every depth
pub fn strip_volatile_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in VOLATILE_KEYS {
                map.remove(key);
            }
            for child in map.values_mut() {
                strip_volatile_keys(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_volatile_keys(item);
            }
        }
        _ => {}
    }
}
