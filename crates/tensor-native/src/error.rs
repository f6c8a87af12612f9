// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape derivation and buffer management.

use crate::LogicalLayout;

/// Errors that can occur while deriving native shapes or managing
/// tensor buffers.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A logical shape was constructed with the wrong number of dimensions.
    #[error("layout {layout:?} expects rank {expected}, got {found}")]
    RankMismatch {
        layout: LogicalLayout,
        expected: usize,
        found: usize,
    },

    /// A per-gate-concatenated layout was used without concatenation info.
    #[error("layout {layout:?} requires gate concatenation info")]
    MissingConcatInfo { layout: LogicalLayout },

    /// Bidirectional fan-in weights were declared with an odd feature width.
    #[error("bidirectional fan-in feature width must be even, found {found}")]
    OddBidirFanIn { found: u32 },

    /// A native shape dimension is zero.
    #[error("native shape dim{dim} is zero")]
    ZeroDimension { dim: u8 },

    /// A native shape dimension exceeds the accelerator's maximum
    /// dimension index size.
    #[error("native shape dim{dim} is {found}, exceeds maximum index size {max}")]
    ExceedsMaxDim { dim: u8, found: u32, max: u32 },

    /// A native tensor exceeds the accelerator's maximum tensor size.
    #[error("native tensor is {found} bytes, exceeds maximum tensor size {max}")]
    ExceedsMaxSize { found: u64, max: u64 },

    /// An outer-dimension slice would run past the parent buffer.
    #[error(
        "slice {index} of {slice_bytes} bytes runs past the parent buffer ({parent_bytes} bytes)"
    )]
    SliceOutOfBounds {
        index: u32,
        slice_bytes: usize,
        parent_bytes: usize,
    },

    /// A view was asked to carry a descriptor larger than its buffer.
    #[error("descriptor requires {required} bytes but the view holds {available}")]
    ViewTooSmall { required: usize, available: usize },

    /// The aligned buffer allocation failed.
    #[error("cannot allocate {bytes} bytes for tensor buffer")]
    AllocationFailure { bytes: usize },
}
