//! Typed error kinds surfaced across the MCP boundary.
//!
//! Internal plumbing uses `anyhow::Result` throughout, matching the rest of
//! this crate's style; `VibeCraftError` exists only at the seams that must
//! hand the agent a stable category (the Tool Dispatch Runtime's `tools/call`
//! response, primarily). See spec §7.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VibeCraftError {
    #[error("configuration invalid: {field}: {message}")]
    ConfigInvalid { field: String, message: String },

    #[error("connection_lost")]
    BridgeUnavailable,

    #[error("bridge authentication failed")]
    BridgeAuthFailed,

    #[error("timeout")]
    RequestTimeout,

    #[error("cancelled")]
    RequestCancelled,

    #[error("{0}")]
    PeerError(String),

    #[error("command rejected ({rule}): {command}")]
    SanitizationRejected { command: String, rule: String },

    #[error("sandbox violation: {0}")]
    SandboxViolation(String),

    #[error("schematic malformed: {0}")]
    SchematicMalformed(String),

    #[error("catalog miss: {0}")]
    CatalogMiss(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl VibeCraftError {
    /// Stable category string returned to the agent alongside the message.
    pub fn category(&self) -> &'static str {
        match self {
            VibeCraftError::ConfigInvalid { .. } => "config_invalid",
            VibeCraftError::BridgeUnavailable => "connection_lost",
            VibeCraftError::BridgeAuthFailed => "bridge_auth_failed",
            VibeCraftError::RequestTimeout => "timeout",
            VibeCraftError::RequestCancelled => "cancelled",
            VibeCraftError::PeerError(_) => "peer_error",
            VibeCraftError::SanitizationRejected { .. } => "sanitization_rejected",
            VibeCraftError::SandboxViolation(_) => "sandbox_violation",
            VibeCraftError::SchematicMalformed(_) => "schematic_malformed",
            VibeCraftError::CatalogMiss(_) => "catalog_miss",
            VibeCraftError::InvalidArgs(_) => "invalid_args",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_stable_per_variant() {
        assert_eq!(VibeCraftError::BridgeUnavailable.category(), "connection_lost");
        assert_eq!(
            VibeCraftError::SanitizationRejected {
                command: "//regen".into(),
                rule: "dangerous operation".into()
            }
            .category(),
            "sanitization_rejected"
        );
    }
}
