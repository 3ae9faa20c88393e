//! Re-serialize a document model
//!
//! Output follows Arazzo field order with `x-` extensions written back after
//! the known fields. Positions and validity flags are not serialized.

use tracing::debug;

use crate::ast::Arazzo;
use crate::error::Result;

pub fn to_yaml(document: &Arazzo) -> Result<String> {
    let yaml = serde_yaml::to_string(document)?;
    debug!(bytes = yaml.len(), "document marshalled to yaml");
    Ok(yaml)
}

pub fn to_json(document: &Arazzo) -> Result<String> {
    let json = serde_json::to_string_pretty(document)?;
    debug!(bytes = json.len(), "document marshalled to json");
    Ok(json)
}
