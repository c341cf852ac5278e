//! Cross-reference resolution.
//!
//! Substitutes every pending slot with the producing node's exported value
//! and records the implied dependency edge on the consumer.

use super::error::SynthError;
use super::types::{AttrValue, CrossReference, ResourceGraph};
use tracing::debug;

/// Placeholder replaced by the resolved value in a reference template.
pub const TEMPLATE_PLACEHOLDER: &str = "{{value}}";

/// Resolve all cross-references in `graph`.
///
/// Target presence and declaration order are re-checked here, since
/// references can be pushed onto the graph without going through insertion.
pub fn wire(mut graph: ResourceGraph) -> Result<ResourceGraph, SynthError> {
    let references = std::mem::take(&mut graph.references);

    for xref in &references {
        let to_index = graph
            .nodes
            .get_index_of(&xref.to_id)
            .ok_or_else(|| dangling(xref))?;
        let from_index = graph
            .nodes
            .get_index_of(&xref.from_id)
            .ok_or_else(|| dangling(xref))?;
        if to_index >= from_index {
            return Err(SynthError::ForwardReference {
                from: xref.from_id.clone(),
                attribute: xref.attribute.clone(),
                to: xref.to_id.clone(),
            });
        }
        let producer = &graph.nodes[to_index];
        let exported = producer
            .export(&xref.to_attribute)
            .ok_or_else(|| SynthError::UnknownAttribute {
                node: xref.to_id.clone(),
                attribute: xref.to_attribute.clone(),
            })?;
        let value = match xref.template {
            Some(ref template) => serde_json::Value::String(render(template, &exported)),
            None => exported,
        };

        let consumer = &mut graph.nodes[from_index];
        consumer
            .config
            .insert(xref.attribute.clone(), AttrValue::Value(value));
        consumer.depends_on.insert(xref.to_id.clone());
        debug!(
            from = %xref.from_id,
            attribute = %xref.attribute,
            to = %xref.to_id,
            to_attribute = %xref.to_attribute,
            "reference wired"
        );
    }

    graph.references = references;
    Ok(graph)
}

fn dangling(xref: &CrossReference) -> SynthError {
    SynthError::DanglingReference {
        from: xref.from_id.clone(),
        attribute: xref.attribute.clone(),
        to: xref.to_id.clone(),
    }
}

fn render(template: &str, value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    template.replace(TEMPLATE_PLACEHOLDER, &text)
}
