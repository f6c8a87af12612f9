// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hardware capability snapshots.
//!
//! The co-processor reports its limits (maximum dimension index size,
//! maximum tensor size, supported parameter-block formats) through a
//! query instruction at startup. Rather than caching that answer in
//! process-wide state, the runtime carries an explicit [`Capabilities`]
//! value: the behaviour of a composite call is then a pure function of
//! its inputs, and tests can exercise arbitrary machine generations.

/// A point-in-time description of what the installed accelerator can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Capabilities {
    /// Largest value any single native dimension may take.
    pub max_dim_index: u32,
    /// Largest native tensor byte size a single operation accepts.
    pub max_tensor_bytes: u64,
    /// Parameter-block format generation the machine implements.
    pub parm_block_version: u16,
}

impl Capabilities {
    /// Capabilities of the first machine generation with the recurrent
    /// activation functions installed.
    pub fn generation1() -> Self {
        Self {
            max_dim_index: 1 << 15,
            max_tensor_bytes: 1 << 32,
            parm_block_version: 0,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::generation1()
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "max dim {}, max tensor {} B, parm block v{}",
            self.max_dim_index, self.max_tensor_bytes, self.parm_block_version
        )
    }
}
