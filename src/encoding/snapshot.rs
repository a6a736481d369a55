use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// Errors produced while decoding a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("value for key '{key}' is not valid base64: {source}")]
    Base64 {
        key: String,
        source: base64::DecodeError,
    },
}

/// Encode the whole mapping as a JSON object with base64 values.
///
/// Keys are emitted in sorted order so identical store contents always
/// produce byte-identical snapshots.
pub fn encode(entries: &HashMap<String, Vec<u8>>) -> Result<Vec<u8>, serde_json::Error> {
    let encoded: BTreeMap<&str, String> = entries
        .iter()
        .map(|(key, value)| (key.as_str(), BASE64.encode(value)))
        .collect();
    serde_json::to_vec(&encoded)
}

/// Decode a snapshot back into the in-memory mapping.
pub fn decode(bytes: &[u8]) -> Result<HashMap<String, Vec<u8>>, SnapshotError> {
    let raw: HashMap<String, String> = serde_json::from_slice(bytes)?;
    raw.into_iter()
        .map(|(key, value)| match BASE64.decode(&value) {
            Ok(decoded) => Ok((key, decoded)),
            Err(source) => Err(SnapshotError::Base64 { key, source }),
        })
        .collect()
}
