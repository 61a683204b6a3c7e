use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = nuvia_common::id::prefixed_ulid("conn");
/// assert!(id.starts_with("conn_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Returns true if `id` is `<prefix>_<ULID>`.
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|ulid| Ulid::from_string(ulid).is_ok())
        .unwrap_or(false)
}

/// Well-known ID prefixes.
pub mod prefix {
    pub const CONNECTION: &str = "conn";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid(prefix::CONNECTION);
        assert!(id.starts_with("conn_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 5 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid(prefix::CONNECTION);
        let b = prefixed_ulid(prefix::CONNECTION);
        assert_ne!(a, b);
    }

    #[test]
    fn test_has_prefix() {
        let id = prefixed_ulid(prefix::CONNECTION);
        assert!(has_prefix(&id, prefix::CONNECTION));
        assert!(!has_prefix(&id, "usr"));
        assert!(!has_prefix("conn_not-a-ulid", prefix::CONNECTION));
        assert!(!has_prefix("connection", prefix::CONNECTION));
    }
}
