//! Pre-publish content validation

use crate::content::kind::FileKind;
use crate::content::normalize::parse_yaml_documents;
use crate::errors::DeployError;

/// Largest document the configuration store accepts
pub const MAX_CONTENT_SIZE: usize = 2 * 1024 * 1024;

/// Check that content parses as its declared type and fits the size limit
pub fn validate_content(content: &[u8], content_type: &str) -> Result<(), DeployError> {
    if content.len() > MAX_CONTENT_SIZE {
        return Err(DeployError::ContentTooLarge {
            size: content.len(),
            limit: MAX_CONTENT_SIZE,
        });
    }

    match FileKind::from_content_type(content_type) {
        FileKind::Json => {
            serde_json::from_slice::<serde_json::Value>(content)
                .map_err(|e| DeployError::InvalidSyntax(format!("invalid JSON: {}", e)))?;
        }
        FileKind::Yaml => {
            parse_yaml_documents(content)?;
        }
        FileKind::Text => {}
    }

    Ok(())
}
