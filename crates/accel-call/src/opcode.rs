// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator function codes.

use tensor_native::CellKind;

/// The primitive operations the recurrent runtime issues.
///
/// Numeric values are the accelerator's own function codes. The full
/// instruction set is wider (elementwise, pooling, convolution, …); the
/// recurrent composite driver only ever issues these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Single-timestep four-gate (LSTM) activation.
    LstmAct = 96,
    /// Single-timestep three-gate (GRU) activation.
    GruAct = 97,
    /// Matrix multiply with fused bias-add.
    MatmulOp = 113,
    /// Matrix multiply with fused bias-add, broadcasting the second and
    /// third operands over the first operand's outer dimension.
    MatmulOpBcast = 114,
}

impl Opcode {
    /// Returns the gate-activation opcode for a cell kind.
    pub fn activation(cell: CellKind) -> Self {
        match cell {
            CellKind::Lstm => Opcode::LstmAct,
            CellKind::Gru => Opcode::GruAct,
        }
    }

    /// Returns the raw function code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable label for this opcode.
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::LstmAct => "lstm-act",
            Opcode::GruAct => "gru-act",
            Opcode::MatmulOp => "matmul-op",
            Opcode::MatmulOpBcast => "matmul-op-bcast",
        }
    }
}
