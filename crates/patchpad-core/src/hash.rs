//! Lightweight content hashing for optimistic conflict checks.
//!
//! 32-bit FNV-1a over the UTF-8 bytes, rendered as 8 lowercase hex digits.
//! Fast and stable across platforms, but not collision resistant; it only
//! detects that a slice has probably changed since an edit was authored.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Returns the hash string an operation author should send as `preHash`.
pub fn content_hash(text: &str) -> String {
    format!("{:08x}", fnv1a(text.as_bytes()))
}

/// Whether `expected` is the hash of `text`. Case and surrounding
/// whitespace in `expected` are ignored.
pub fn matches(expected: &str, text: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(&content_hash(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(content_hash(""), "811c9dc5");
        assert_eq!(content_hash("a"), "e40c292c");
    }

    #[test]
    fn test_consistent_and_distinct() {
        assert_eq!(content_hash("foo bar"), content_hash("foo bar"));
        assert_ne!(content_hash("foo"), content_hash("xyz"));
        assert_eq!(content_hash("héllo").len(), 8);
    }

    #[test]
    fn test_matches_ignores_case_and_whitespace() {
        let h = content_hash("world").to_uppercase();
        assert!(matches(&format!(" {h}\n"), "world"));
        assert!(!matches(&h, "World"));
    }
}
