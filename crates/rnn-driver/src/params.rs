// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Call-wide scalar parameters.
//!
//! A composite call derives one [`RnnParams`] bundle from the caller's
//! tensors up front; everything downstream (planner, scheduler) reads
//! these named values instead of re-fishing dimensions out of tensors.

use crate::RnnError;
use std::str::FromStr;
use tensor_native::{padded_width, CellKind, Tensor};

/// The processing direction of a recurrent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// Process timesteps first to last.
    Forward,
    /// Process timesteps last to first.
    Backward,
    /// Run both directions over the same input and horizontally
    /// concatenate their outputs.
    Bidirectional,
}

impl Direction {
    /// Number of direction passes this value implies.
    pub fn directions(self) -> u32 {
        match self {
            Direction::Forward | Direction::Backward => 1,
            Direction::Bidirectional => 2,
        }
    }

    /// Returns a human-readable label for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "fwd",
            Direction::Backward => "bwd",
            Direction::Bidirectional => "bidir",
        }
    }
}

impl FromStr for Direction {
    type Err = RnnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fwd" | "forward" => Ok(Direction::Forward),
            "bwd" | "backward" => Ok(Direction::Backward),
            "bidir" | "bidirectional" => Ok(Direction::Bidirectional),
            other => Err(RnnError::InvalidDirection {
                found: other.to_string(),
            }),
        }
    }
}

/// Scalar parameters of one composite call, derived once from the
/// caller's tensors and read-only for the remainder of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RnnParams {
    /// Cell kind this call runs.
    pub cell: CellKind,
    /// Timestep count (input outer dimension).
    pub timesteps: u32,
    /// Batch size.
    pub batch: u32,
    /// Hidden-state size, unpadded.
    pub hidden: u32,
    /// Gate count for the cell kind.
    pub gates: u32,
    /// Hidden-state size padded to the tiling granularity.
    pub padded_hidden: u32,
    /// Concatenated weight width: `gates · padded_hidden`.
    pub gate_width_total: u32,
    /// Direction passes (1 or 2).
    pub directions: u32,
}

impl RnnParams {
    /// Derives the parameter bundle from the (already verified) caller
    /// tensors.
    pub fn derive(
        cell: CellKind,
        direction: Direction,
        input: &Tensor,
        h0: &Tensor,
        weights: &Tensor,
    ) -> Self {
        let hidden = h0.native().shape.dim1;
        Self {
            cell,
            timesteps: input.native().shape.dim4,
            batch: input.native().shape.dim2,
            hidden,
            gates: cell.gate_count(),
            padded_hidden: padded_width(hidden),
            gate_width_total: weights.native().shape.dim1,
            directions: direction.directions(),
        }
    }
}
