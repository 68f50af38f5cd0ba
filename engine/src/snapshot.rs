//! JSON encoding of the local tally.
//!
//! The persisted form is a flat JSON array of records, in collection order:
//! `[{"name":"Alice","votes":2}, ...]`.

use crate::{error::Result, Error, VoteRecord};

/// Key under which the local tally is stored.
pub const STORAGE_KEY: &str = "voters_list_v1";

/// Serialize the collection.
pub fn to_json(records: &[VoteRecord]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

/// Deserialize the collection, rejecting anything that is not a record array.
pub fn from_json(json: &str) -> Result<Vec<VoteRecord>> {
    serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

/// Deserialize a stored value, treating absent or malformed data as empty.
///
/// The literal strings `null` and `undefined` are what a browser leaves
/// behind after storing an unset value, so they count as absent.
pub fn decode_stored(raw: Option<&str>) -> Vec<VoteRecord> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => return Vec::new(),
        Some(raw) => raw,
    };

    match from_json(raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Discarding unreadable stored tally: {}", e);
            Vec::new()
        }
    }
}
