//! Local token estimation.

use genbridge_core::{Content, Result};

const BYTES_PER_TOKEN: usize = 4;

/// Rough token count for `contents`: one token per four bytes of their JSON
/// serialization, rounded up. Never calls the provider.
pub fn estimate_tokens(contents: &[Content]) -> Result<u32> {
    let serialized = serde_json::to_vec(contents)?;
    Ok(u32::try_from(serialized.len().div_ceil(BYTES_PER_TOKEN)).unwrap_or(u32::MAX))
}
