//! Session configuration

use crate::policy::PolicyKind;
use serde::{Deserialize, Serialize};

/// Narrowest identifier the allocator will produce
pub const MIN_ID_WIDTH: usize = 8;
/// Widest identifier the allocator will produce
pub const MAX_ID_WIDTH: usize = 64;

/// Editing session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Hex digits in newly allocated identifiers
    pub id_width: usize,
    /// Seed for reproducible identifiers; fresh entropy when absent
    pub seed: Option<u64>,
    /// Policy used by `dedupe_default`
    pub dedupe_policy: PolicyKind,
    /// Refuse to open larger files
    pub max_file_size: u64,
    /// Refuse to commit over a file that changed since open
    pub check_stale: bool,
    /// Only fail edits on problems the document did not already have
    pub baseline_relative: bool,
}

impl EditConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With identifier width
    #[inline]
    #[must_use]
    pub fn with_id_width(mut self, width: usize) -> Self {
        self.id_width = width;
        self
    }

    /// With a fixed RNG seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// With default dedupe policy
    #[inline]
    #[must_use]
    pub fn with_dedupe_policy(mut self, policy: PolicyKind) -> Self {
        self.dedupe_policy = policy;
        self
    }

    /// With maximum file size
    #[inline]
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// With or without the stale-file check
    #[inline]
    #[must_use]
    pub fn with_stale_check(mut self, enabled: bool) -> Self {
        self.check_stale = enabled;
        self
    }

    /// With or without baseline-relative integrity checks
    #[inline]
    #[must_use]
    pub fn with_baseline_relative(mut self, enabled: bool) -> Self {
        self.baseline_relative = enabled;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Describes the first out-of-range field.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_ID_WIDTH..=MAX_ID_WIDTH).contains(&self.id_width) {
            return Err(format!(
                "id_width must be between {MIN_ID_WIDTH} and {MAX_ID_WIDTH}, got {}",
                self.id_width
            ));
        }
        if self.max_file_size == 0 {
            return Err("max_file_size must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            id_width: 24,
            seed: None,
            dedupe_policy: PolicyKind::LongestPath,
            max_file_size: 64 * 1024 * 1024,
            check_stale: true,
            baseline_relative: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EditConfig::default();
        assert_eq!(config.id_width, 24);
        assert!(config.check_stale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_methods() {
        let config = EditConfig::new()
            .with_seed(7)
            .with_id_width(16)
            .with_dedupe_policy(PolicyKind::EarliestIdentifier);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.id_width, 16);
        assert_eq!(config.dedupe_policy, PolicyKind::EarliestIdentifier);
    }

    #[test]
    fn json_with_partial_fields() {
        let config =
            EditConfig::from_json_str(r#"{"seed": 42, "dedupe_policy": "earliest_identifier"}"#)
                .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.dedupe_policy, PolicyKind::EarliestIdentifier);
        assert_eq!(config.id_width, 24);
    }

    #[test]
    fn rejects_bad_width() {
        assert!(EditConfig::new().with_id_width(2).validate().is_err());
        assert!(EditConfig::new().with_max_file_size(0).validate().is_err());
    }
}
