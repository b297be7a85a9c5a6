//! Adapter configuration, read from the Lambda function environment.

use crate::target::QueryStrategy;

const QUERY_STRATEGY_VAR: &str = "ALB_ADAPTER_QUERY_STRATEGY";
const FAULT_POLICY_VAR: &str = "ALB_ADAPTER_FAULT_POLICY";

/// What happens when the handler panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Let the panic unwind into the Lambda runtime, which fails the invocation.
    #[default]
    Propagate,
    /// Catch the panic and answer `500 Internal Server Error`.
    Respond500,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    pub query_strategy: QueryStrategy,
    pub fault_policy: FaultPolicy,
}

impl AdapterConfig {
    /// Read `ALB_ADAPTER_QUERY_STRATEGY` (`trusted` | `canonical`) and
    /// `ALB_ADAPTER_FAULT_POLICY` (`propagate` | `respond-500`). Unset means default.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(QUERY_STRATEGY_VAR) {
            cfg.query_strategy = match raw.trim().to_ascii_lowercase().as_str() {
                "trusted" => QueryStrategy::Trusted,
                "canonical" => QueryStrategy::Canonical,
                _ => anyhow::bail!(
                    "invalid {QUERY_STRATEGY_VAR} ({raw}): expected trusted or canonical"
                ),
            };
        }

        if let Some(raw) = lookup(FAULT_POLICY_VAR) {
            cfg.fault_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "propagate" => FaultPolicy::Propagate,
                "respond-500" | "respond500" => FaultPolicy::Respond500,
                _ => anyhow::bail!(
                    "invalid {FAULT_POLICY_VAR} ({raw}): expected propagate or respond-500"
                ),
            };
        }

        Ok(cfg)
    }
}
