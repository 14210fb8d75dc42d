//! Content and profile kinds

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_YAML: &str = "application/x-yaml";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Syntax family of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Json,
    Yaml,
    Text,
}

impl FileKind {
    /// Derive the kind from a file name's extension
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => FileKind::Json,
            Some("yaml") | Some("yml") => FileKind::Yaml,
            _ => FileKind::Text,
        }
    }

    /// Derive the kind from a MIME content type, ignoring parameters
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => FileKind::Json,
            "application/x-yaml" | "application/yaml" | "text/yaml" | "text/x-yaml" => {
                FileKind::Yaml
            }
            _ => FileKind::Text,
        }
    }

    /// Canonical content type used when publishing
    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Json => CONTENT_TYPE_JSON,
            FileKind::Yaml => CONTENT_TYPE_YAML,
            FileKind::Text => CONTENT_TYPE_TEXT,
        }
    }
}

/// Declared shape of a configuration profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationProfileKind {
    #[default]
    Freeform,
    FeatureFlags,
}

impl ConfigurationProfileKind {
    /// Content type to publish with.
    ///
    /// Feature flag documents are always JSON; freeform profiles take the
    /// explicit override, falling back to the data file's extension.
    pub fn resolve_content_type(&self, data_file: &Path, explicit: Option<&str>) -> String {
        match self {
            ConfigurationProfileKind::FeatureFlags => CONTENT_TYPE_JSON.to_string(),
            ConfigurationProfileKind::Freeform => match explicit {
                Some(content_type) => content_type.to_string(),
                None => FileKind::from_path(data_file).content_type().to_string(),
            },
        }
    }

    /// Whether server-assigned timestamp fields are stripped before comparison
    pub fn strips_timestamps(&self) -> bool {
        matches!(self, ConfigurationProfileKind::FeatureFlags)
    }
}

impl From<store_api::models::ProfileType> for ConfigurationProfileKind {
    fn from(value: store_api::models::ProfileType) -> Self {
        match value {
            store_api::models::ProfileType::Freeform => ConfigurationProfileKind::Freeform,
            store_api::models::ProfileType::FeatureFlags => ConfigurationProfileKind::FeatureFlags,
        }
    }
}
