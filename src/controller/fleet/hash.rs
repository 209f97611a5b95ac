use super::error::FleetError;
use crate::crd::ClusterTemplateSpec;

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// Consonants and digits only, so encoded hashes never spell words
const SAFE_ALPHANUMS: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// 32-bit FNV-1a, deterministic across processes unlike DefaultHasher/SipHash
struct Fnv32a(u32);

impl Fnv32a {
    fn new() -> Self {
        Fnv32a(FNV32_OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u32::from(*byte);
            self.0 = self.0.wrapping_mul(FNV32_PRIME);
        }
    }

    fn finish(&self) -> u32 {
        self.0
    }
}

/// Compute the template hash used as a replica-set's identity
///
/// The template is serialized to canonical JSON (struct fields in declaration
/// order, maps sorted by key) and fed through FNV-1a. When present, the
/// collision count is mixed in as 4 little-endian bytes so that a fleet can
/// step past an existing replica-set whose hash collides with its template.
/// Nothing is mixed in for `None`, so `None` and `Some(0)` hash differently;
/// fleets that never saw a collision keep their original hash.
/// The decimal hash is then passed through [`safe_encode`].
///
/// # Errors
/// Returns SerializationError if the template cannot be serialized to JSON
pub fn compute_hash(
    template: &ClusterTemplateSpec,
    collision_count: Option<i32>,
) -> Result<String, FleetError> {
    let canonical = serde_json::to_vec(template)
        .map_err(|e| FleetError::SerializationError(e.to_string()))?;

    let mut hasher = Fnv32a::new();
    hasher.write(&canonical);

    if let Some(count) = collision_count {
        hasher.write(&(count as u32).to_le_bytes());
    }

    Ok(safe_encode(&hasher.finish().to_string()))
}

/// Map every byte of `s` onto [`SAFE_ALPHANUMS`]
pub fn safe_encode(s: &str) -> String {
    s.bytes()
        .map(|b| SAFE_ALPHANUMS[b as usize % SAFE_ALPHANUMS.len()] as char)
        .collect()
}
