//! Script classification table.
//!
//! Maps well-known lock script code hashes to a human label. Anything not in
//! the table is `"Unknown"`.

use fundflow_core::Script;
use fundflow_core::primitives::UNKNOWN_SCRIPT_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownScript {
    pub code_hash: String,
    pub hash_type: String,
    pub label: String,
}

/// Well-known mainnet lock scripts.
const MAINNET: [(&str, &str, &str); 4] = [
    (
        "0x9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8",
        "type",
        "Secp256k1Blake160",
    ),
    (
        "0xd369597ff47f29fbc0d47d2e3775370d1250b85140c670e4718af712983a2354",
        "type",
        "AnyoneCanPay",
    ),
    (
        "0x82d76d1b75fe2fd9a27dfbaa65a039221a380d76c926f378d3f81cf3e7e13f2e",
        "type",
        "NervosDao",
    ),
    (
        "0x5c5069eb0857efc65e1bca0c07df34c31663b3622fd3876c876320fc9634e2a8",
        "type",
        "Secp256k1Multisig",
    ),
];

/// Lookup table keyed by `(code_hash, hash_type)`.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    labels: BTreeMap<(String, String), String>,
}

impl ScriptRegistry {
    /// An empty registry: everything classifies as unknown.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry preloaded with the mainnet system scripts.
    #[must_use]
    pub fn mainnet() -> Self {
        let mut registry = Self::empty();
        for (code_hash, hash_type, label) in MAINNET {
            registry.insert(KnownScript {
                code_hash: code_hash.to_string(),
                hash_type: hash_type.to_string(),
                label: label.to_string(),
            });
        }
        registry
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, known: KnownScript) {
        self.labels
            .insert((known.code_hash, known.hash_type), known.label);
    }

    /// Label for `script`. Only the code hash and hash type matter.
    #[must_use]
    pub fn classify(&self, script: &Script) -> &str {
        self.labels
            .get(&(script.code_hash.clone(), script.hash_type.clone()))
            .map_or(UNKNOWN_SCRIPT_LABEL, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_labels() {
        let registry = ScriptRegistry::mainnet();
        assert_eq!(registry.len(), 4);
        let secp = Script::new(MAINNET[0].0, "type", "0x36c329ed630d6ce750712a477543672adab57f4c");
        assert_eq!(registry.classify(&secp), "Secp256k1Blake160");
    }

    #[test]
    fn hash_type_matters() {
        let registry = ScriptRegistry::mainnet();
        let data = Script::new(MAINNET[0].0, "data", "0x");
        assert_eq!(registry.classify(&data), UNKNOWN_SCRIPT_LABEL);
    }

    #[test]
    fn custom_entries_override() {
        let mut registry = ScriptRegistry::mainnet();
        registry.insert(KnownScript {
            code_hash: MAINNET[2].0.into(),
            hash_type: "type".into(),
            label: "Dao".into(),
        });
        assert_eq!(registry.classify(&Script::new(MAINNET[2].0, "type", "0x")), "Dao");
        assert_eq!(ScriptRegistry::empty().classify(&Script::new("0x", "type", "0x")), "Unknown");
    }
}
