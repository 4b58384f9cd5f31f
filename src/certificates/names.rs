// Name Hasher - canonical digest of a certificate's DNS names
//
// Two certificates cover the same name set iff their digests are equal. Names
// are trimmed, lower-cased, sorted and deduplicated before hashing, so the
// digest does not depend on SAN order or case.

use sha2::{Digest, Sha256};

/// SHA-256 digest of a normalized name set
pub type NameDigest = [u8; 32];

/// Separator between names in the hashed string; never valid inside a DNS name
const NAME_SEPARATOR: &str = ",";

/// Normalize a single DNS name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lower-case, sort and deduplicate a sequence of DNS names
pub fn normalize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = names
        .into_iter()
        .map(|n| normalize_name(n.as_ref()))
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Compute the canonical name-set digest.
///
/// An empty sequence hashes the empty string.
pub fn hash_names<I, S>(names: I) -> NameDigest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = normalize_names(names).join(NAME_SEPARATOR);
    Sha256::digest(joined.as_bytes()).into()
}

/// Hex rendering of a digest for logs
pub fn hex_digest(digest: &[u8]) -> String {
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_case_independent() {
        let a = hash_names(["example-A.com", "SHARED-example.com"]);
        let b = hash_names(["shared-example.com", "example-a.com"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicates_do_not_change_digest() {
        let a = hash_names(["a.example.com", "b.example.com"]);
        let b = hash_names(["b.example.com", "A.example.com", "a.example.com"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_sets_differ() {
        let a = hash_names(["a.example.com"]);
        let b = hash_names(["b.example.com"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_set_hashes_empty_string() {
        let empty: [&str; 0] = [];
        assert_eq!(
            hex_digest(&hash_names(empty)),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_known_digest() {
        // sha256("a.example.com,b.example.com")
        let expected = Sha256::digest(b"a.example.com,b.example.com");
        assert_eq!(
            hash_names(["B.example.com", "a.example.com"]).as_slice(),
            expected.as_slice()
        );
    }

    #[test]
    fn test_normalize_names() {
        assert_eq!(
            normalize_names([" Example.COM ", "a.example.com", "example.com"]),
            vec!["a.example.com".to_string(), "example.com".to_string()]
        );
    }
}
