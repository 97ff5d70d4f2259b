//! Vault configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "owners": ["0x...01", "0x...02"],
//!   "quorum": 2,
//!   "expiry_window_secs": 259200,
//!   "labels": { "0x...01": "alice" }
//! }
//! ```

use crate::error::{VaultError, VaultResult};
use crate::types::{Amount, Identity, OwnerSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Proposals stay confirmable for three days after submission.
pub const DEFAULT_EXPIRY_WINDOW: u64 = 3 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub owners: Vec<Identity>,
    pub quorum: usize,
    #[serde(default = "default_expiry_window")]
    pub expiry_window_secs: u64,
    /// Display names for reports. Purely cosmetic.
    #[serde(default)]
    pub labels: BTreeMap<Identity, String>,
    #[serde(default)]
    pub initial_balance: Amount,
}

fn default_expiry_window() -> u64 {
    DEFAULT_EXPIRY_WINDOW
}

impl VaultConfig {
    pub fn new(owners: Vec<Identity>, quorum: usize) -> Self {
        Self {
            owners,
            quorum,
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW,
            labels: BTreeMap::new(),
            initial_balance: Amount::ZERO,
        }
    }

    pub fn with_expiry_window(mut self, secs: u64) -> Self {
        self.expiry_window_secs = secs;
        self
    }

    pub fn with_initial_balance(mut self, balance: Amount) -> Self {
        self.initial_balance = balance;
        self
    }

    pub fn from_json_str(json: &str) -> VaultResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VaultError::InvalidConfig(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VaultError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks the owner list and `1 <= quorum <= owners`.
    pub fn validate(&self) -> VaultResult<OwnerSet> {
        let owners = OwnerSet::from_owners(self.owners.iter().copied()).map_err(|e| match e {
            VaultError::InvariantViolation(msg) => VaultError::InvalidConfig(msg),
            other => other,
        })?;
        if self.quorum == 0 || self.quorum > owners.len() {
            return Err(VaultError::InvalidConfig(format!(
                "quorum {} outside 1..={}",
                self.quorum,
                owners.len()
            )));
        }
        if self.expiry_window_secs == 0 {
            return Err(VaultError::InvalidConfig(
                "expiry window must be positive".into(),
            ));
        }
        Ok(owners)
    }

    /// Label for `identity`, falling back to its checksummed address.
    pub fn label(&self, identity: &Identity) -> String {
        self.labels
            .get(identity)
            .cloned()
            .unwrap_or_else(|| identity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn parses_with_defaults() {
        let json = r#"{
            "owners": ["0x0000000000000000000000000000000000000001"],
            "quorum": 1
        }"#;
        let cfg = VaultConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.expiry_window_secs, DEFAULT_EXPIRY_WINDOW);
        assert_eq!(cfg.initial_balance, Amount::ZERO);
        assert!(cfg.labels.is_empty());
    }

    #[test]
    fn rejects_quorum_above_owner_count() {
        let cfg = VaultConfig::new(vec![Address::with_last_byte(1)], 2);
        assert!(matches!(cfg.validate(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_quorum_and_duplicates() {
        let a = Address::with_last_byte(1);
        assert!(VaultConfig::new(vec![a], 0).validate().is_err());
        assert!(VaultConfig::new(vec![a, a], 1).validate().is_err());
        assert!(VaultConfig::new(vec![], 1).validate().is_err());
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        assert!(matches!(
            VaultConfig::from_json_str("{ not json"),
            Err(VaultError::InvalidConfig(_))
        ));
    }

    #[test]
    fn label_falls_back_to_address() {
        let a = Address::with_last_byte(1);
        let mut cfg = VaultConfig::new(vec![a], 1);
        assert_eq!(cfg.label(&a), a.to_string());
        cfg.labels.insert(a, "alice".into());
        assert_eq!(cfg.label(&a), "alice");
    }
}
