// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # work-area
//!
//! Scratch-region planning and ownership for RNN composite operations.
//!
//! A multi-timestep recurrent call chains many primitive accelerator
//! operations, and every intermediate result between them needs a
//! buffer: the fused pre-activations for all timesteps, the per-step
//! hidden-projection result, and the ping-pong slots that let one step
//! read the previous step's state while writing its own (the hardware
//! forbids a call's input and output addresses from overlapping).
//!
//! # Key Components
//!
//! - [`WorkAreaPlan`] — the exact byte size and sub-layout of the
//!   scratch region for one direction, computed without allocating.
//! - [`WorkArea`] — the page-aligned arena itself, released on drop.
//! - [`validate_caller_buffer`] — checks for caller-supplied scratch.
//!
//! # Ownership Model
//!
//! One composite call exclusively owns its work area for its whole
//! duration. A bidirectional call splits the area into two disjoint
//! halves, one per direction; the halves have no data dependency on
//! each other. Internally allocated areas are freed by RAII on every
//! exit path; caller-supplied buffers are never freed.
//!
//! # Example
//! ```
//! use tensor_native::CellKind;
//! use work_area::{WorkArea, WorkAreaPlan};
//!
//! let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
//! assert_eq!(plan.direction_bytes(), 81920);
//!
//! let mut area = WorkArea::allocate(plan.total_bytes(2)).unwrap();
//! assert_eq!(area.as_mut_slice().len(), 163840);
//! ```

mod arena;
mod error;
mod plan;

pub use arena::{validate_caller_buffer, WorkArea};
pub use error::WorkAreaError;
pub use plan::WorkAreaPlan;
