// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for work-area allocation and validation.

/// Errors that can occur while acquiring or validating the scratch
/// region of a composite call.
#[derive(Debug, thiserror::Error)]
pub enum WorkAreaError {
    /// The page-aligned allocation for the work area failed.
    #[error("unable to allocate {bytes} bytes for work area")]
    AllocationFailure { bytes: usize },

    /// A caller-supplied scratch buffer is smaller than the plan requires.
    #[error("caller work area holds {found} bytes but {required} are required")]
    BufferTooSmall { required: usize, found: usize },

    /// A caller-supplied scratch buffer does not start on a page boundary.
    #[error("caller work area at {addr:#x} is not aligned to {align} bytes")]
    Misaligned { addr: usize, align: usize },
}
