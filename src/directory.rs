//! Location directory
//!
//! Maps device identifiers (normalized MAC-address strings) to
//! human-readable location labels. The table is built once at startup from
//! configuration and is read-only afterwards, so it can be shared across
//! concurrent requests without locking.

use anyhow::{bail, Result};
use std::collections::HashMap;

/// Normalize a device identifier for lookup.
///
/// Lower-cases the identifier and strips all whitespace, edge and
/// internal. Idempotent: normalizing twice yields the same string.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Immutable device-identifier to location-label mapping.
#[derive(Debug, Clone)]
pub struct LocationDirectory {
    entries: HashMap<String, String>,
}

impl LocationDirectory {
    /// Build the directory from raw `(identifier, label)` pairs.
    ///
    /// Every raw key is normalized before insertion so runtime lookups need
    /// no further normalization. Two raw keys that collapse to the same
    /// normalized key are a configuration error, surfaced here rather than
    /// at lookup time.
    pub fn build<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = HashMap::new();
        for (raw, label) in entries {
            let key = normalize(raw.as_ref());
            if map.insert(key.clone(), label.into()).is_some() {
                bail!("duplicate location entry for device identifier '{}'", key);
            }
        }
        Ok(Self { entries: map })
    }

    /// Look up the location label for an already-normalized identifier.
    ///
    /// Total and infallible: unknown identifiers simply resolve to `None`.
    pub fn resolve(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    /// Number of entries in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips_whitespace() {
        assert_eq!(normalize("3A:4F:EC:85:C0:65:36:19"), "3a:4f:ec:85:c0:65:36:19");
        assert_eq!(normalize("  8e:d0 :82:0b "), "8e:d0:82:0b");
        assert_eq!(normalize("aa\tbb\ncc"), "aabbcc");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["3A:4F :EC", "already:normal", "  ", "MiXeD Case"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_resolve_built_entries() {
        let directory = LocationDirectory::build([
            ("3a:4f:ec:85:c0:65:36:19", "raum_1_08"),
            ("8E:D0:82:0B:A8:E5:C8:93", "roboterlabor"),
        ])
        .unwrap();

        assert_eq!(directory.resolve("3a:4f:ec:85:c0:65:36:19"), Some("raum_1_08"));
        // Keys were normalized at build time
        assert_eq!(directory.resolve("8e:d0:82:0b:a8:e5:c8:93"), Some("roboterlabor"));
        assert_eq!(directory.resolve("unknown:mac"), None);
    }

    #[test]
    fn test_duplicate_normalized_keys_rejected() {
        let result = LocationDirectory::build([
            ("aa:bb:cc", "lab"),
            ("AA:BB :CC", "office"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_directory() {
        let directory = LocationDirectory::build(Vec::<(&str, &str)>::new()).unwrap();
        assert!(directory.is_empty());
        assert_eq!(directory.resolve("anything"), None);
    }
}
