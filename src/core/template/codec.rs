// src/core/template/codec.rs
//
// Fixed layout for persisted biometric templates: each element is one
// little-endian IEEE-754 f32, concatenated in order. No length prefix;
// element count is recovered from byte count / 4.

use crate::utils::error::{CoreError, Result};

pub fn encode(values: &[f32]) -> Result<Vec<u8>> {
    let mut blob = Vec::with_capacity(values.len() * 4);
    for (i, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(CoreError::Encoding(format!(
                "element {} is not a finite 32-bit float",
                i
            )));
        }
        blob.extend_from_slice(&value.to_le_bytes());
    }
    Ok(blob)
}

pub fn decode(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(CoreError::Decoding(format!(
            "blob length {} is not a multiple of 4",
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
