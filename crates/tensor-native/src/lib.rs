// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-native
//!
//! Native (tiled) tensor descriptors and buffers for a fixed-function
//! neural-network co-processor.
//!
//! The accelerator addresses memory as fixed-size pages subdivided into
//! fixed-width sticks of the innermost dimension, so every tensor it
//! touches has two descriptions: the *logical* shape the caller thinks
//! in, and the four-dimension *native* shape the hardware sees. This
//! crate provides:
//!
//! - [`LogicalShape`] / [`NativeShape`] / [`NativeDesc`] — the two shape
//!   worlds and the bit-exact native byte-size formula.
//! - [`CellKind`] and the gate-concatenation algebra ([`padded_width`],
//!   [`concatenated_width1`], [`concatenated_width2`], [`ConcatInfo`]) —
//!   how recurrent weight/bias tensors are padded and concatenated.
//! - [`Tensor`] — an owned, page-aligned native buffer with a ready flag.
//! - [`TensorView`] — non-owning aliases, including outer-dimension
//!   slicing for per-direction views.
//!
//! # Design Goals
//! - Shape math is pure and total: dimension integers in, dimension
//!   integers out, errors for contract violations, never silent fixes.
//! - Views are zero-copy and never own; only [`Tensor`] frees memory.
//! - Clean error types via `thiserror`.

mod aligned;
mod cell;
mod concat;
mod dtype;
mod error;
mod shape;
mod tensor;

pub use aligned::AlignedBuf;
pub use cell::CellKind;
pub use concat::{
    concatenated_width1, concatenated_width2, padded_width, ConcatInfo, ConcatUsage, PrevLayer,
};
pub use dtype::{DataType, Format};
pub use error::LayoutError;
pub use shape::{
    LogicalLayout, LogicalShape, NativeDesc, NativeShape, CELLS_PER_STICK, PAGE_BYTES,
    STICKS_PER_PAGE,
};
pub use tensor::{Tensor, TensorView};
