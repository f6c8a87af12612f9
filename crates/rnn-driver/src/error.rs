// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types and call outcomes for the composite driver.

use std::fmt;

/// What a dimension check expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The dimension must be exactly this value.
    Exactly(u32),
    /// The dimension must be one of these two values (the output outer
    /// dimension may be the timestep count or 1).
    OneOf(u32, u32),
    /// The dimension must be nonzero.
    NonZero,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(v) => write!(f, "{v}"),
            Expected::OneOf(a, b) => write!(f, "{a} or {b}"),
            Expected::NonZero => write!(f, "a nonzero value"),
        }
    }
}

/// Errors that can occur during a composite recurrent call.
#[derive(Debug, thiserror::Error)]
pub enum RnnError {
    /// A tensor dimension violates the call contract. Always raised
    /// before any hardware call; fix the inputs and retry.
    #[error("{tensor} dim{dim} shape is invalid (found {found}, expected {expected})")]
    InvalidShape {
        tensor: &'static str,
        dim: u8,
        found: u32,
        expected: Expected,
    },

    /// A tensor's element type disagrees with the rest of the set.
    #[error("{tensor} element type is invalid (found {found}, expected {expected})")]
    InvalidType {
        tensor: &'static str,
        found: &'static str,
        expected: &'static str,
    },

    /// A tensor's native layout format disagrees with the rest of the set.
    #[error("{tensor} native format is invalid (found {found}, expected {expected})")]
    InvalidFormat {
        tensor: &'static str,
        found: &'static str,
        expected: &'static str,
    },

    /// A direction string did not name one of the three recognised values.
    #[error("'{found}' is not a valid direction (expected fwd, bwd, or bidir)")]
    InvalidDirection { found: String },

    /// Work-area allocation or caller-buffer validation failed. Always
    /// raised before any hardware call.
    #[error("work area error: {0}")]
    WorkArea(#[from] work_area::WorkAreaError),

    /// Shape derivation or buffer bookkeeping failed.
    #[error("layout error: {0}")]
    Layout(#[from] tensor_native::LayoutError),

    /// The accelerator reported a failure. Fatal to the whole composite
    /// call; the output tensors are undefined.
    #[error("accelerator error: {0}")]
    Accel(#[from] accel_call::AccelError),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// The result of a successful composite call.
///
/// A completed call may still carry the accelerator's element-range
/// warning: some output elements over- or underflowed the native format.
/// The outputs are usable; the flag is informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RnnOutcome {
    /// At least one primitive call flagged an element range violation.
    pub range_violation: bool,
}

impl RnnOutcome {
    /// An outcome with no warnings.
    pub fn clean() -> Self {
        Self::default()
    }
}
