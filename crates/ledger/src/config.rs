//! Ledger session configuration.
//!
//! Read from the environment with defaults; invalid values fall back to the
//! default with a warning.

use crate::ledger::DEFAULT_SUBTOTAL_LABEL;

pub const ENV_SUBTOTAL_LABEL: &str = "DENTAPLAN_SUBTOTAL_LABEL";
pub const ENV_CURRENCY: &str = "DENTAPLAN_CURRENCY";
pub const ENV_FAIL_FAST: &str = "DENTAPLAN_FAIL_FAST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Label given to subtotals added or renamed without one.
    pub default_subtotal_label: String,
    /// Currency code printed next to amounts in exported documents.
    pub currency: String,
    /// Report an inconsistent ledger as an error instead of repairing it.
    /// Defaults to on in debug builds and off in release builds.
    pub fail_fast: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_subtotal_label: DEFAULT_SUBTOTAL_LABEL.to_string(),
            currency: "BYN".to_string(),
            fail_fast: cfg!(debug_assertions),
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_subtotal_label = lookup(ENV_SUBTOTAL_LABEL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_subtotal_label);

        let currency = lookup(ENV_CURRENCY)
            .map(|v| v.trim().to_uppercase())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.currency);

        let fail_fast = match lookup(ENV_FAIL_FAST) {
            None => defaults.fail_fast,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    tracing::warn!(
                        value = other,
                        "{ENV_FAIL_FAST} is not a boolean; using default"
                    );
                    defaults.fail_fast
                }
            },
        };

        Self {
            default_subtotal_label,
            currency,
            fail_fast,
        }
    }
}
