//! Input fingerprints used for reevaluation decisions.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hashes resolved inputs into a short stable fingerprint.
///
/// Keys are ordered, so equal inputs always hash the same.
#[must_use]
pub fn fingerprint_inputs(inputs: &Map<String, Value>) -> String {
    let json = serde_json::to_string(inputs).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
