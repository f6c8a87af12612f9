// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-call
//!
//! The narrow interface between the recurrent runtime and the
//! co-processor's primitive operations.
//!
//! Issuing a primitive operation means marshalling a fixed-size
//! parameter block (function code, up to three input tensors, up to two
//! output tensors, function-specific parameter words) and executing a
//! privileged instruction. That last step is machine-specific and out of
//! scope here; this crate defines everything around it:
//!
//! - [`Opcode`] — the function codes the recurrent driver issues.
//! - [`AccelCall`] — one marshalled invocation.
//! - [`ParamBlock`] — the function-specific parameter words.
//! - [`InvokeOutcome`] / [`AccelError`] — completion, the non-fatal
//!   element-range warning, and fatal exception/response codes.
//! - [`Capabilities`] — an explicit hardware capability snapshot.
//! - [`Accelerator`] — the backend trait. The real backend wraps the
//!   privileged instruction; tests substitute an in-memory double.
//!
//! Every invocation is synchronous and blocking: when `invoke` returns,
//! the output buffers are written (or the call failed). There is no
//! asynchronous completion to wait for.

mod capability;
mod opcode;
mod outcome;
mod parmblock;

pub use capability::Capabilities;
pub use opcode::Opcode;
pub use outcome::{AccelError, InvokeOutcome, RANGE_VIOLATION_FLAG};
pub use parmblock::{MatmulFusion, ParamBlock, PARM_WORDS};

use tensor_native::TensorView;

/// One marshalled accelerator invocation: an opcode, up to three input
/// views, up to two output views, and the function-specific parameters.
///
/// Unused operand positions stay `None`; the used positions are packed
/// from the front, matching the hardware's operand numbering.
#[derive(Debug, Clone, Copy)]
pub struct AccelCall<'a> {
    pub opcode: Opcode,
    pub inputs: [Option<TensorView<'a>>; 3],
    pub outputs: [Option<TensorView<'a>>; 2],
    pub parms: ParamBlock,
}

impl<'a> AccelCall<'a> {
    /// Builds a call record.
    pub fn new(
        opcode: Opcode,
        inputs: [Option<TensorView<'a>>; 3],
        outputs: [Option<TensorView<'a>>; 2],
        parms: ParamBlock,
    ) -> Self {
        Self {
            opcode,
            inputs,
            outputs,
            parms,
        }
    }

    /// Iterates over the populated input views.
    pub fn inputs(&self) -> impl Iterator<Item = &TensorView<'a>> {
        self.inputs.iter().flatten()
    }

    /// Iterates over the populated output views.
    pub fn outputs(&self) -> impl Iterator<Item = &TensorView<'a>> {
        self.outputs.iter().flatten()
    }
}

/// A backend that executes primitive accelerator operations.
///
/// Implementations must be synchronous: `invoke` returns only once the
/// operation has fully completed and the output buffers are written.
/// The trait is the seam between the composite scheduling logic and the
/// machine — production code wraps the privileged instruction, tests
/// substitute recording or fault-injecting doubles.
pub trait Accelerator {
    /// Returns the capability snapshot for this backend.
    fn capabilities(&self) -> Capabilities;

    /// Executes one primitive operation.
    ///
    /// Returns the completion outcome (possibly carrying the non-fatal
    /// range-violation flag) or a hardware-level error. Implementations
    /// report raw exception flags in the outcome; interpretation is the
    /// caller's job via [`Accelerator::invoke_checked`].
    fn invoke(&self, call: &AccelCall<'_>) -> Result<InvokeOutcome, AccelError>;

    /// Executes one primitive operation and interprets its exception
    /// flags: any flag other than the element-range warning becomes
    /// [`AccelError::UnsupportedException`].
    fn invoke_checked(&self, call: &AccelCall<'_>) -> Result<InvokeOutcome, AccelError> {
        let outcome = self.invoke(call)?;
        if outcome.unsupported_exception() {
            return Err(AccelError::UnsupportedException {
                flags: outcome.exception_flags,
            });
        }
        if outcome.range_violation() {
            tracing::warn!(
                "range violation on {} operation output",
                call.opcode.as_str()
            );
        }
        Ok(outcome)
    }
}
