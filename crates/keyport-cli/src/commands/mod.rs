//! Command handlers. Each returns `Err(message)` for the caller to print.

pub mod entropy;
pub mod plan;
pub mod vault;

use std::path::Path;

use serde::de::DeserializeOwned;

/// Reads and parses a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, String> {
    if !path.exists() {
        return Err(format!("{what} file not found: {}", path.display()));
    }
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {what} file: {e}"))?;
    serde_json::from_str(&json).map_err(|e| format!("failed to parse {what} file: {e}"))
}
