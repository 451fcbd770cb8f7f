//! Stable hashing: overload disambiguation suffixes and the build determinism checksum.

use sha2::{Digest as _, Sha256};

use crate::reference::ExternalEntity;

/// Digits used for base-36 disambiguation hashes.
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the short disambiguation hash for a symbol.
///
/// The hash is derived from the symbol's precise identifier, which encodes the
/// full signature, so it is stable across builds and distinct for overloads.
/// The first four bytes of the SHA-256 digest are rendered in base 36.
pub fn disambiguation_hash(precise: &str) -> String {
    let digest = Sha256::digest(precise.as_bytes());
    let mut prefix = [0_u8; 4];
    for (slot, byte) in prefix.iter_mut().zip(digest.iter()) {
        *slot = *byte;
    }
    return to_base36(u32::from_be_bytes(prefix));
}

/// Render a number in lowercase base 36.
fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let index = usize::try_from(value % 36).unwrap_or(0);
        digits.push(BASE36_DIGITS.get(index).copied().unwrap_or(b'0'));
        value /= 36;
    }
    digits.reverse();
    return String::from_utf8_lossy(&digits).into_owned();
}

/// Checksum over externally resolved reference summaries.
///
/// Entities are sorted by identifier, each is serialized as one JSON line, and
/// the concatenation is SHA-256 hashed. Equal inputs give equal checksums
/// regardless of the order pages were translated in.
///
/// # Errors
///
/// Returns `serde_json::Error` if an entity cannot be serialized.
pub fn external_references_checksum(entities: &[&ExternalEntity]) -> Result<String, serde_json::Error> {
    let mut sorted: Vec<&ExternalEntity> = entities.to_vec();
    sorted.sort_by(|a, b| return a.reference.cmp(&b.reference));

    let mut hasher = Sha256::new();
    for entity in sorted {
        hasher.update(serde_json::to_vec(entity)?);
        hasher.update(b"\n");
    }
    return Ok(format!("{:x}", hasher.finalize()));
}
