/// Canonical hashing helpers for the determinism contract.
///
/// Every hash in the chain is SHA-256 over a canonical byte string:
/// - `input_hash` over the sorted canonical forecast lines,
/// - `solver_config_hash` over key-sorted config JSON,
/// - `output_hash` over key-sorted, assignment-sorted output JSON.
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::models::{sort_assignments, Assignment};

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Serialize with deterministic key order. `serde_json`'s map is ordered by
/// key, so round-tripping through `Value` sorts every object.
pub fn canonical_json<T: Serialize>(value: &T) -> String {
    let v: Value = serde_json::to_value(value).unwrap_or(Value::Null);
    v.to_string()
}

/// `canonicalize(canonicalize(x)) = canonicalize(x)`.
pub fn canonicalize(json_text: &str) -> Option<String> {
    let v: Value = serde_json::from_str(json_text).ok()?;
    Some(v.to_string())
}

/// The canonical output document: sorted assignment records bound to the
/// config hash. Snapshot payloads persist exactly this text, so a
/// snapshot's content hash always equals the plan's output hash.
pub fn output_document(assignments: &[Assignment], solver_config_hash: &str) -> String {
    let mut sorted = assignments.to_vec();
    sort_assignments(&mut sorted);

    let records: Vec<Value> = sorted
        .iter()
        .map(|a| {
            serde_json::json!({
                "driver_id": a.driver_id,
                "tour_instance_id": a.tour_instance_id,
                "day": a.day.index(),
                "block_id": a.block_id,
                "block_type": a.block_type.as_str(),
                "start_min": a.start_min,
                "end_min": a.end_min,
                "crosses_midnight": a.crosses_midnight,
            })
        })
        .collect();

    serde_json::json!({
        "assignments": records,
        "solver_config_hash": solver_config_hash,
    })
    .to_string()
}

/// Output hash over the canonical output document.
pub fn output_hash(assignments: &[Assignment], solver_config_hash: &str) -> String {
    sha256_hex(output_document(assignments, solver_config_hash).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BlockType, Weekday};

    fn assignment(driver: &str, tour: &str, day: Weekday) -> Assignment {
        Assignment {
            plan_version_id: 0,
            driver_id: driver.to_string(),
            tour_instance_id: tour.to_string(),
            day,
            block_id: format!("B1-{tour}"),
            block_type: BlockType::Single,
            start_min: 360,
            end_min: 540,
            crosses_midnight: false,
        }
    }

    #[test]
    fn output_hash_is_order_insensitive() {
        let a = assignment("D001", "T1", Weekday::Monday);
        let b = assignment("D002", "T2", Weekday::Tuesday);

        let h1 = output_hash(&[a.clone(), b.clone()], "cfg");
        let h2 = output_hash(&[b, a], "cfg");
        assert_eq!(h1, h2);
    }

    #[test]
    fn output_hash_binds_config() {
        let a = assignment("D001", "T1", Weekday::Monday);
        assert_ne!(
            output_hash(std::slice::from_ref(&a), "cfg-a"),
            output_hash(&[a], "cfg-b")
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let raw = r#"{"b": 2, "a": {"z": 1, "y": [3, 2]}}"#;
        let once = canonicalize(raw).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
    }
}
