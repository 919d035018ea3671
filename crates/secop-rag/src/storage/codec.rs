//! Vector serialization for the `vector_json` column

use crate::error::{Error, Result};

/// Encode a vector as a JSON array
pub fn encode_vector(vector: &[f32]) -> Result<String> {
    Ok(serde_json::to_string(vector)?)
}

/// Decode a stored vector, checking its length against the store dimension
pub fn decode_vector(group_id: &str, ordinal: i64, raw: &str, dimensions: usize) -> Result<Vec<f32>> {
    let vector: Vec<f32> = serde_json::from_str(raw).map_err(|e| Error::StoreCorruption {
        group_id: group_id.to_string(),
        ordinal,
        reason: format!("unparsable vector: {}", e),
    })?;

    if vector.len() != dimensions {
        return Err(Error::StoreCorruption {
            group_id: group_id.to_string(),
            ordinal,
            reason: format!("vector has {} dimensions, store has {}", vector.len(), dimensions),
        });
    }

    Ok(vector)
}
