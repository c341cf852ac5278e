//! BLAKE3 fingerprints for plans.

use super::types::PlanStep;

/// Fingerprint ordered plan steps.
///
/// Each step contributes its id, kind, canonical JSON config, and
/// dependencies, so any change in ordering or content changes the digest.
pub fn fingerprint_steps(steps: &[PlanStep]) -> String {
    let mut hasher = blake3::Hasher::new();
    for step in steps {
        hasher.update(step.id.as_bytes());
        hasher.update(b"\0");
        hasher.update(step.kind.to_string().as_bytes());
        hasher.update(b"\0");
        let config = serde_json::to_string(&step.config).unwrap_or_default();
        hasher.update(config.as_bytes());
        hasher.update(b"\0");
        hasher.update(step.depends_on.join(",").as_bytes());
        hasher.update(b"\n");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}
