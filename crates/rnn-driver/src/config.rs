// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! precheck = true
//!
//! [capabilities]
//! max_dim_index = 32768
//! max_tensor_bytes = 4294967296
//! parm_block_version = 0
//! ```

use accel_call::Capabilities;
use std::path::Path;

/// Configuration for the composite recurrent engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Run the contract verifier and per-call operand checks before
    /// issuing hardware calls. On by default; turning it off trades the
    /// attributable errors for a little per-call latency.
    #[serde(default = "default_true")]
    pub precheck: bool,
    /// Override the backend's capability snapshot (useful for pinning a
    /// machine generation in tests or conservative deployments).
    #[serde(default)]
    pub capabilities: Option<Capabilities>,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precheck: true,
            capabilities: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, crate::RnnError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::RnnError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, crate::RnnError> {
        toml::from_str(toml_str)
            .map_err(|e| crate::RnnError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, crate::RnnError> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::RnnError::Config(format!("TOML serialise error: {e}")))
    }
}
