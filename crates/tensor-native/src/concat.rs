// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Gate-concatenation shape algebra.
//!
//! Recurrent weight and bias tensors hold one sub-matrix per gate,
//! horizontally concatenated. Each gate's region must start on a stick
//! boundary, so the per-gate width is padded up to [`CELLS_PER_STICK`]
//! before concatenation. Weights fed by a bidirectional previous layer
//! additionally need their feature dimension concatenated vertically,
//! because that input is itself a direction-concatenated pair.
//!
//! All functions here are pure: dimension integers in, dimension
//! integers out, no tensor data involved.

use crate::shape::{ceil_div, CELLS_PER_STICK};
use crate::{CellKind, LayoutError};

/// What role a concatenated tensor plays in the recurrent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConcatUsage {
    /// Input-side weights (features × gate width).
    Weights,
    /// Hidden-side weights (hidden × gate width).
    HiddenWeights,
    /// Input-side biases.
    Biases,
    /// Hidden-side biases.
    HiddenBiases,
}

/// Fan-in of the previous layer feeding this tensor's features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PrevLayer {
    /// Previous layer output is single-direction (or this is the first layer).
    Uni,
    /// Previous layer output is a bidirectional concatenated pair.
    Bidir,
}

/// Tags a weight/bias tensor with everything the padding and
/// concatenation rules need. Immutable, attached at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ConcatInfo {
    pub cell: CellKind,
    pub usage: ConcatUsage,
    pub prev_layer: PrevLayer,
}

impl ConcatInfo {
    /// Creates concatenation info for a tensor role.
    pub fn new(cell: CellKind, usage: ConcatUsage, prev_layer: PrevLayer) -> Self {
        Self { cell, usage, prev_layer }
    }
}

/// Rounds a hidden-state width up to the hardware tiling granularity so
/// each gate's region starts on a stick boundary.
///
/// # Examples
/// ```
/// use tensor_native::padded_width;
/// assert_eq!(padded_width(16), 64);
/// assert_eq!(padded_width(64), 64);
/// assert_eq!(padded_width(65), 128);
/// ```
#[inline]
pub fn padded_width(hidden: u32) -> u32 {
    ceil_div(hidden, CELLS_PER_STICK) * CELLS_PER_STICK
}

/// Horizontally concatenated innermost width for a weight/bias tensor:
/// `gate_count · padded_width(raw)`.
///
/// With no concatenation info (a tensor that is not a recurrent
/// weight/bias), the raw width passes through unchanged.
pub fn concatenated_width1(raw: u32, info: Option<&ConcatInfo>) -> u32 {
    match info {
        Some(info) => info.cell.gate_count() * padded_width(raw),
        None => raw,
    }
}

/// Vertically concatenated feature width, applicable only to input-side
/// weights whose fan-in comes from a bidirectional previous layer:
/// `padded_width(raw / 2) · 2`.
///
/// The raw width is the previous layer's direction-concatenated output,
/// so it must be even; an odd width is a caller contract violation and
/// is reported, never silently corrected. Every other case is identity.
pub fn concatenated_width2(raw: u32, info: Option<&ConcatInfo>) -> Result<u32, LayoutError> {
    match info {
        Some(info)
            if info.usage == ConcatUsage::Weights && info.prev_layer == PrevLayer::Bidir =>
        {
            if raw % 2 != 0 {
                return Err(LayoutError::OddBidirFanIn { found: raw });
            }
            Ok(padded_width(raw / 2) * 2)
        }
        _ => Ok(raw),
    }
}
