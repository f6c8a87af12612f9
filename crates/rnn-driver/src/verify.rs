// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Contract verification for composite recurrent calls.
//!
//! Two layers of checking guard the hardware:
//!
//! - [`verify_composite_tensors`] validates the caller's full tensor set
//!   once, before any primitive call is issued. The checks run in a
//!   fixed order and fail fast: the first violation is reported with the
//!   offending tensor's name and the expected vs. found value, and
//!   nothing reaches the accelerator.
//! - [`verify_matmul_call`] / [`verify_activation_call`] validate the
//!   operands of each individual primitive call the scheduler builds
//!   (the sliced and re-described internal views), immediately before
//!   that call is issued.
//!
//! Everything here is a pure read-only predicate: no tensor is ever
//! mutated, no side effects.
//!
//! Dimension requirements for the composite set (native dims 4..1):
//!
//! ```text
//! legend: ts = timesteps, b = batch, d = directions, f = features,
//!         g = gates, s = hidden, s_pad = padded(s), in_pad = g·s_pad,
//!         out_pad = d·s_pad
//!
//! input          | (ts, 1, b, f)
//! h0 / c0        | (d, 1, b, s)
//! weights        | (d, 1, f, in_pad)
//! biases         | (d, 1, 1, in_pad)
//! hidden_weights | (d, 1, s, in_pad)
//! hidden_biases  | (d, 1, 1, in_pad)
//! hn_output      | (ts | 1, 1, b, s | out_pad)
//! cf_output      | (1, 1, b, s | out_pad)      (four-gate cell only)
//! ```

use crate::{Direction, Expected, RnnError};
use tensor_native::{padded_width, CellKind, NativeDesc, Tensor, TensorView};

/// A named descriptor, the unit every check operates on.
type Named<'a> = (&'static str, &'a NativeDesc);

/// Checks dimension `dim` of every named descriptor against `expected`.
fn check_dim(dim: u8, expected: u32, tensors: &[Named<'_>]) -> Result<(), RnnError> {
    for (tensor, desc) in tensors {
        let found = desc.shape.dim(dim);
        if found != expected {
            return Err(RnnError::InvalidShape {
                tensor,
                dim,
                found,
                expected: Expected::Exactly(expected),
            });
        }
    }
    Ok(())
}

/// Checks element type and native format of every named descriptor
/// against the reference descriptor (type first, then format, per tensor).
fn check_fields(reference: &NativeDesc, tensors: &[Named<'_>]) -> Result<(), RnnError> {
    for (tensor, desc) in tensors {
        if desc.dtype != reference.dtype {
            return Err(RnnError::InvalidType {
                tensor,
                found: desc.dtype.as_str(),
                expected: reference.dtype.as_str(),
            });
        }
        if desc.format != reference.format {
            return Err(RnnError::InvalidFormat {
                tensor,
                found: desc.format.as_str(),
                expected: reference.format.as_str(),
            });
        }
    }
    Ok(())
}

/// Verifies the caller's full tensor set for a composite recurrent call.
///
/// `c0` and `cf_output` participate only for the four-gate cell.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_composite_tensors(
    cell: CellKind,
    direction: Direction,
    input: &Tensor,
    h0: &Tensor,
    c0: Option<&Tensor>,
    weights: &Tensor,
    biases: &Tensor,
    hidden_weights: &Tensor,
    hidden_biases: &Tensor,
    hn_output: &Tensor,
    cf_output: Option<&Tensor>,
) -> Result<(), RnnError> {
    let input_d = input.native();
    let h0_d = h0.native();
    let lstm = cell.has_cell_state();
    let c0_d = c0.map(Tensor::native);
    let cf_d = cf_output.map(Tensor::native);

    let timesteps = input_d.shape.dim4;

    // 1. Timestep count must be nonzero (it divides the fused region).
    if timesteps == 0 {
        return Err(RnnError::InvalidShape {
            tensor: "input",
            dim: 4,
            found: 0,
            expected: Expected::NonZero,
        });
    }

    // 2. Output outer dimension selects all-timesteps vs final-only mode.
    let hn_dim4 = hn_output.native().shape.dim4;
    if hn_dim4 != timesteps && hn_dim4 != 1 {
        return Err(RnnError::InvalidShape {
            tensor: "hn_output",
            dim: 4,
            found: hn_dim4,
            expected: Expected::OneOf(timesteps, 1),
        });
    }

    // 3. Batch size agrees across input, states, and outputs.
    let batch = input_d.shape.dim2;
    check_dim(2, batch, &[("h0", h0_d), ("hn_output", hn_output.native())])?;
    if lstm {
        check_dim(
            2,
            batch,
            &[
                ("c0", c0_d.expect("four-gate call carries c0")),
                ("cf_output", cf_d.expect("four-gate call carries cf_output")),
            ],
        )?;
    }

    // 4. Weights consume the input's feature dimension.
    check_dim(2, input_d.shape.dim1, &[("weights", weights.native())])?;

    // 5. The must-be-1 dimension is 1 everywhere it exists.
    check_dim(
        3,
        1,
        &[
            ("input", input_d),
            ("h0", h0_d),
            ("weights", weights.native()),
            ("biases", biases.native()),
            ("hidden_weights", hidden_weights.native()),
            ("hidden_biases", hidden_biases.native()),
            ("hn_output", hn_output.native()),
        ],
    )?;
    if lstm {
        check_dim(
            3,
            1,
            &[
                ("c0", c0_d.expect("four-gate call carries c0")),
                ("cf_output", cf_d.expect("four-gate call carries cf_output")),
            ],
        )?;
    }

    // 6. Bias rows broadcast over the batch, so their batch-like
    //    dimension must be 1.
    check_dim(
        2,
        1,
        &[
            ("biases", biases.native()),
            ("hidden_biases", hidden_biases.native()),
        ],
    )?;

    // 7. Direction count agrees across state and weight/bias tensors,
    //    and matches the requested direction.
    let dirs = h0_d.shape.dim4;
    check_dim(
        4,
        dirs,
        &[
            ("weights", weights.native()),
            ("biases", biases.native()),
            ("hidden_weights", hidden_weights.native()),
            ("hidden_biases", hidden_biases.native()),
        ],
    )?;
    if lstm {
        check_dim(4, dirs, &[("c0", c0_d.expect("four-gate call carries c0"))])?;
    }
    check_dim(4, direction.directions(), &[("h0", h0_d)])?;

    // 8. Output width: the hidden size, or for bidirectional calls the
    //    direction-concatenated padded pair.
    let hidden = h0_d.shape.dim1;
    let out_width = if dirs == 2 {
        2 * padded_width(hidden)
    } else {
        hidden
    };
    check_dim(1, out_width, &[("hn_output", hn_output.native())])?;
    if lstm {
        check_dim(
            1,
            out_width,
            &[("cf_output", cf_d.expect("four-gate call carries cf_output"))],
        )?;
    }

    // 9. Weight/bias innermost width is the gate-concatenated total.
    let gate_width_total = cell.gate_count() * padded_width(hidden);
    check_dim(
        1,
        gate_width_total,
        &[
            ("weights", weights.native()),
            ("biases", biases.native()),
            ("hidden_weights", hidden_weights.native()),
            ("hidden_biases", hidden_biases.native()),
        ],
    )?;
    if lstm {
        check_dim(1, hidden, &[("c0", c0_d.expect("four-gate call carries c0"))])?;
    }

    // 10. Hidden weights consume the (unpadded) hidden state.
    check_dim(2, hidden, &[("hidden_weights", hidden_weights.native())])?;

    // 11. Element type and native format are uniform across the set.
    check_fields(
        input_d,
        &[
            ("h0", h0_d),
            ("weights", weights.native()),
            ("biases", biases.native()),
            ("hidden_weights", hidden_weights.native()),
            ("hidden_biases", hidden_biases.native()),
            ("hn_output", hn_output.native()),
        ],
    )?;
    if lstm {
        check_fields(
            input_d,
            &[
                ("c0", c0_d.expect("four-gate call carries c0")),
                ("cf_output", cf_d.expect("four-gate call carries cf_output")),
            ],
        )?;
    }

    Ok(())
}

/// Verifies the operands of one matmul-with-bias-add call.
///
/// With `broadcast` set (the pre-loop fused matmul), the weight and bias
/// operands have a single outer plane broadcast over the first operand's
/// outer dimension; otherwise all outer dimensions must agree.
pub(crate) fn verify_matmul_call(
    broadcast: bool,
    input_a: &TensorView<'_>,
    input_b: &TensorView<'_>,
    input_c: &TensorView<'_>,
    output: &TensorView<'_>,
) -> Result<(), RnnError> {
    let a = input_a.native();
    let b = input_b.native();
    let c = input_c.native();
    let out = output.native();

    if broadcast {
        check_dim(4, a.shape.dim4, &[("output", out)])?;
        check_dim(4, 1, &[("input_b", b), ("input_c", c)])?;
    } else {
        check_dim(
            4,
            a.shape.dim4,
            &[("input_b", b), ("input_c", c), ("output", out)],
        )?;
    }
    check_dim(
        3,
        1,
        &[
            ("input_a", a),
            ("input_b", b),
            ("input_c", c),
            ("output", out),
        ],
    )?;
    check_dim(2, 1, &[("input_c", c)])?;
    check_dim(2, a.shape.dim2, &[("output", out)])?;
    check_dim(2, a.shape.dim1, &[("input_b", b)])?;
    check_dim(1, b.shape.dim1, &[("input_c", c), ("output", out)])?;
    check_fields(
        a,
        &[("input_b", b), ("input_c", c), ("output", out)],
    )?;
    Ok(())
}

/// Verifies the operands of one single-timestep gate-activation call.
pub(crate) fn verify_activation_call(
    cell: CellKind,
    ts_fused: &TensorView<'_>,
    bias_add: &TensorView<'_>,
    prev_state: &TensorView<'_>,
    h_output: &TensorView<'_>,
    c_output: Option<&TensorView<'_>>,
) -> Result<(), RnnError> {
    let fused = ts_fused.native();
    let gates = cell.gate_count();

    check_dim(
        4,
        1,
        &[
            ("prev_state", prev_state.native()),
            ("h_output", h_output.native()),
        ],
    )?;
    check_dim(
        4,
        gates,
        &[("ts_fused", fused), ("bias_add", bias_add.native())],
    )?;
    let all: [Named<'_>; 4] = [
        ("ts_fused", fused),
        ("bias_add", bias_add.native()),
        ("prev_state", prev_state.native()),
        ("h_output", h_output.native()),
    ];
    check_dim(3, 1, &all)?;
    check_dim(2, fused.shape.dim2, &all)?;
    check_dim(1, fused.shape.dim1, &all)?;
    if cell.has_cell_state() {
        let c_out = c_output.expect("four-gate activation carries c_output");
        let named: [Named<'_>; 1] = [("c_output", c_out.native())];
        check_dim(4, 1, &named)?;
        check_dim(3, 1, &named)?;
        check_dim(2, fused.shape.dim2, &named)?;
        check_dim(1, fused.shape.dim1, &named)?;
        check_fields(fused, &named)?;
    }
    check_fields(fused, &all[1..])?;
    Ok(())
}
