//! Stack output extraction.

use super::builder::OUTPUT_IDS;
use super::error::SynthError;
use super::types::{AttrValue, ResourceGraph};
use indexmap::IndexMap;

/// Collect the named outputs from a wired graph.
///
/// Always returns exactly the bucket name, distribution address, and API
/// address, in that order.
pub fn emit(graph: &ResourceGraph) -> Result<IndexMap<String, String>, SynthError> {
    let mut outputs = IndexMap::new();
    for id in OUTPUT_IDS {
        let unresolved = || SynthError::UnresolvedReference {
            node: id.to_string(),
            attribute: "value".to_string(),
        };
        let node = graph.get(id).ok_or_else(unresolved)?;
        let value = match node.config.get("value") {
            Some(AttrValue::Value(serde_json::Value::String(s))) => s.clone(),
            Some(AttrValue::Value(other)) => other.to_string(),
            Some(AttrValue::Pending) | None => return Err(unresolved()),
        };
        outputs.insert(id.to_string(), value);
    }
    Ok(outputs)
}
