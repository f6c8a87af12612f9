// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Recurrent cell kinds and their associated constants.

/// The two recurrent cell kinds the co-processor supports.
///
/// Everything cell-dependent (gate count, presence of a cell state,
/// concatenated tensor widths) is derived from this one tagged variant
/// instead of being re-decided at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CellKind {
    /// Four-gate cell (forget/input/cell/output) with a separate cell state.
    Lstm,
    /// Three-gate cell (update/reset/hidden), hidden state only.
    Gru,
}

impl CellKind {
    /// Number of gate sub-transforms concatenated into the weight and
    /// bias tensors for this cell kind.
    pub fn gate_count(self) -> u32 {
        match self {
            CellKind::Lstm => 4,
            CellKind::Gru => 3,
        }
    }

    /// Returns `true` if this cell kind carries a cell state alongside
    /// the hidden state (and therefore a second output tensor).
    pub fn has_cell_state(self) -> bool {
        matches!(self, CellKind::Lstm)
    }

    /// Returns a human-readable label for this cell kind.
    pub fn as_str(self) -> &'static str {
        match self {
            CellKind::Lstm => "lstm",
            CellKind::Gru => "gru",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_count() {
        assert_eq!(CellKind::Lstm.gate_count(), 4);
        assert_eq!(CellKind::Gru.gate_count(), 3);
    }

    #[test]
    fn test_cell_state() {
        assert!(CellKind::Lstm.has_cell_state());
        assert!(!CellKind::Gru.has_cell_state());
    }
}
