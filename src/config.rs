//! Key-value configuration boundary.
//!
//! All tunable parameters of the pipeline can be supplied through a flat
//! key-value source. Every getter takes a documented default that is
//! substituted silently when a key is absent or malformed; callers that
//! require non-default values must validate the resulting parameters
//! themselves (see [`crate::HandGeometry::validate`]).
//!
//! # Example
//!
//! ```
//! use grasp_candidates::config::ConfigMap;
//!
//! let config = ConfigMap::parse_str(
//!     "# hand description\n\
//!      finger_width = 0.01\n\
//!      hand_outer_diameter = 0.12\n\
//!      voxelize = true\n\
//!      workspace = -1.0 1.0 -1.0 1.0 -1.0 1.0\n",
//! );
//!
//! assert_eq!(config.get_f64_or("finger_width", 0.0), 0.01);
//! assert_eq!(config.get_f64_or("missing_key", 0.5), 0.5);
//! assert!(config.get_bool_or("voxelize", false));
//! ```

use std::collections::BTreeMap;

/// A flat key-value configuration source with typed, defaulting getters.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Creates an empty configuration. Every lookup falls back to its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `(key, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { entries }
    }

    /// Parses `key = value` lines. Blank lines and `#` comments are ignored;
    /// lines without `=` are skipped.
    #[must_use]
    pub fn parse_str(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { entries }
    }

    /// Inserts or replaces a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the raw string value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns a floating point value, or `default` when absent or malformed.
    #[must_use]
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Returns an unsigned integer value, or `default` when absent or malformed.
    #[must_use]
    pub fn get_usize_or(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Returns a boolean value (`true`/`false`/`1`/`0`), or `default`.
    #[must_use]
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            _ => default,
        }
    }

    /// Returns a whitespace-separated list of floats, or `default` when the
    /// key is absent or any element is malformed.
    #[must_use]
    pub fn get_f64_list_or(&self, key: &str, default: &[f64]) -> Vec<f64> {
        self.get(key)
            .and_then(|v| {
                v.split_whitespace()
                    .map(|s| s.parse().ok())
                    .collect::<Option<Vec<f64>>>()
            })
            .unwrap_or_else(|| default.to_vec())
    }

    /// Returns a whitespace-separated list of unsigned integers, or `default`.
    #[must_use]
    pub fn get_usize_list_or(&self, key: &str, default: &[usize]) -> Vec<usize> {
        self.get(key)
            .and_then(|v| {
                v.split_whitespace()
                    .map(|s| s.parse().ok())
                    .collect::<Option<Vec<usize>>>()
            })
            .unwrap_or_else(|| default.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigMap::new();
        assert_eq!(config.get_f64_or("finger_width", 0.01), 0.01);
        assert_eq!(config.get_usize_or("num_samples", 100), 100);
        assert!(!config.get_bool_or("voxelize", false));
    }

    #[test]
    fn test_parse_str_basic() {
        let config = ConfigMap::parse_str("a = 1.5\nb=2\n");
        assert_eq!(config.get_f64_or("a", 0.0), 1.5);
        assert_eq!(config.get_usize_or("b", 0), 2);
    }

    #[test]
    fn test_parse_str_comments_and_blank_lines() {
        let config = ConfigMap::parse_str("# comment\n\na = 1.0 # trailing\nnot a pair\n");
        assert_eq!(config.get_f64_or("a", 0.0), 1.0);
        assert!(config.get("not a pair").is_none());
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let config = ConfigMap::parse_str("a = not_a_number\n");
        assert_eq!(config.get_f64_or("a", 3.0), 3.0);
    }

    #[test]
    fn test_bool_values() {
        let config = ConfigMap::parse_str("x = 1\ny = false\n");
        assert!(config.get_bool_or("x", false));
        assert!(!config.get_bool_or("y", true));
    }

    #[test]
    fn test_f64_list() {
        let config = ConfigMap::parse_str("workspace = -1 1 -1 1 0 2\n");
        let ws = config.get_f64_list_or("workspace", &[0.0; 6]);
        assert_eq!(ws, vec![-1.0, 1.0, -1.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_usize_list() {
        let config = ConfigMap::parse_str("hand_axes = 0 2\n");
        assert_eq!(config.get_usize_list_or("hand_axes", &[2]), vec![0, 2]);
    }

    #[test]
    fn test_from_pairs_and_set() {
        let mut config = ConfigMap::from_pairs([("a", "1.0")]);
        config.set("b", "2.0");
        assert_eq!(config.get_f64_or("a", 0.0), 1.0);
        assert_eq!(config.get_f64_or("b", 0.0), 2.0);
    }
}
