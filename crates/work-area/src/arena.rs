// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The work-area buffer itself: a page-aligned arena owned by one
//! composite call.
//!
//! The composite driver either borrows a caller-supplied buffer (after
//! validating it) or allocates a [`WorkArea`] of its own. Ownership is
//! RAII: an internally allocated area is released when the value drops,
//! which covers every exit path — success, verifier rejection, or a
//! hardware error halfway through a direction.

use crate::WorkAreaError;
use tensor_native::{AlignedBuf, PAGE_BYTES};

/// A page-aligned scratch buffer for one composite call.
pub struct WorkArea {
    buf: AlignedBuf,
}

impl WorkArea {
    /// Allocates a zeroed, 4096-byte-aligned work area of `bytes` bytes.
    pub fn allocate(bytes: usize) -> Result<Self, WorkAreaError> {
        let buf = AlignedBuf::zeroed(bytes)
            .map_err(|_| WorkAreaError::AllocationFailure { bytes })?;
        tracing::debug!("allocated {bytes} byte work area");
        Ok(Self { buf })
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the buffer is empty (never true for a live area).
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the whole arena as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_mut_slice()
    }
}

impl std::fmt::Debug for WorkArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkArea").field("len", &self.len()).finish()
    }
}

/// Validates a caller-supplied scratch buffer: it must hold at least
/// `required` bytes and start on a page boundary.
pub fn validate_caller_buffer(buf: &[u8], required: usize) -> Result<(), WorkAreaError> {
    if buf.len() < required {
        return Err(WorkAreaError::BufferTooSmall {
            required,
            found: buf.len(),
        });
    }
    let addr = buf.as_ptr() as usize;
    if addr % PAGE_BYTES != 0 {
        return Err(WorkAreaError::Misaligned {
            addr,
            align: PAGE_BYTES,
        });
    }
    Ok(())
}
