// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The directional scheduler: one direction's timestep loop.
//!
//! One call processes exactly one of four internal directions. The
//! public API only distinguishes forward/backward/bidirectional; the
//! composite driver expands bidirectional into two scheduler calls over
//! sliced inputs and disjoint work-area halves.
//!
//! Per direction the schedule is:
//!
//! 1. One broadcast matmul+bias-add of the *entire* input against the
//!    input-side weights into the fused region — every timestep's
//!    input-side pre-activation, computed before the loop.
//! 2. Per timestep: the previous hidden state through the hidden-side
//!    weights into the bias-add region, then the gate activation over
//!    (fused slice, bias-add, previous state) into the current hidden
//!    (and cell) destination.
//!
//! All address bookkeeping runs on [`Location`] values — named offsets
//! into the caller's output buffers or the work area — rather than live
//! pointers. "Advancing the previous state" is re-binding a `Location`,
//! never a copy. Output placement follows the output mode:
//!
//! - All-timesteps: step one output slot per iteration in processing
//!   direction (two slots for one half of a bidirectional pair, whose
//!   partner owns the interleaved other half), so results always land
//!   in input-timestep order no matter the processing order.
//! - Final-only: ping-pong between two work-area slots, switching the
//!   destination to the caller's buffer on the second-to-last iteration
//!   so the very last activation writes the final result directly. The
//!   ping-pong never runs for a single timestep — the one activation
//!   writes straight to the caller's buffer.
//!
//! Cell state (four-gate cell only) is always final-only.
//!
//! The first non-success status from the accelerator aborts the loop and
//! propagates unchanged. The element-range warning is accumulated, not
//! fatal: processing continues and the outputs remain usable.

use crate::params::RnnParams;
use crate::verify;
use crate::RnnError;
use accel_call::{AccelCall, Accelerator, MatmulFusion, Opcode, ParamBlock};
use std::ptr::NonNull;
use tensor_native::{NativeDesc, TensorView};
use work_area::WorkAreaPlan;

/// The four directions the scheduler distinguishes internally. Forward
/// vs backward controls the processing order of timesteps; uni vs bidir
/// controls how destinations move across the interleaved output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InternalDirection {
    UniFwd,
    UniBwd,
    BidirFwd,
    BidirBwd,
}

/// Per-direction (sliced, for bidirectional calls) caller tensors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirectionInputs<'a> {
    pub h0: TensorView<'a>,
    pub c0: Option<TensorView<'a>>,
    pub weights: TensorView<'a>,
    pub biases: TensorView<'a>,
    pub hidden_weights: TensorView<'a>,
    pub hidden_biases: TensorView<'a>,
}

/// Where a loop-internal state tensor currently lives.
///
/// The work area is one arena and the caller's outputs are fixed
/// buffers; every "tensor" inside the loop is one of these named
/// offsets, resolved to a view only at the moment a call is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// The caller's initial state slice (h0 or c0).
    Initial,
    /// A byte offset into the caller's output buffer.
    Output(usize),
    /// A ping-pong slot in this direction's work area
    /// (plane 0 = hidden, plane 1 = cell).
    Scratch { plane: usize, slot: usize },
}

/// Loop iteration bounds for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoopBounds {
    start: i64,
    /// Exclusive bound (`timesteps` ascending, `-1` descending).
    end: i64,
    delta: i64,
    /// Output slots stepped per iteration in all-timesteps mode
    /// (1 unidirectional, 2 for one half of a bidirectional pair,
    /// 0 in final-only mode).
    shift: usize,
}

fn loop_bounds(dir: InternalDirection, timesteps: u32, all_timesteps: bool) -> LoopBounds {
    let ts = timesteps as i64;
    match dir {
        InternalDirection::UniFwd => LoopBounds {
            start: 0,
            end: ts,
            delta: 1,
            shift: if all_timesteps { 1 } else { 0 },
        },
        InternalDirection::UniBwd => LoopBounds {
            start: ts - 1,
            end: -1,
            delta: -1,
            shift: if all_timesteps { 1 } else { 0 },
        },
        InternalDirection::BidirFwd => LoopBounds {
            start: 0,
            end: ts,
            delta: 1,
            shift: if all_timesteps { 2 } else { 0 },
        },
        InternalDirection::BidirBwd => LoopBounds {
            start: ts - 1,
            end: -1,
            delta: -1,
            shift: if all_timesteps { 2 } else { 0 },
        },
    }
}

/// First-iteration hidden destination.
///
/// All-timesteps destinations start at the slot holding the first
/// processed timestep's result: slot 0 going forward, the last slot
/// going backward (one further slot in for the backward half of a
/// bidirectional pair, which owns the second slot of each interleaved
/// row). Final-only destinations start in scratch — except with a single
/// timestep, where the one result goes straight to the caller's buffer.
fn initial_hidden_dest(
    dir: InternalDirection,
    timesteps: u32,
    all_timesteps: bool,
    slot_bytes: usize,
) -> Location {
    let last = (timesteps - 1) as usize;
    if all_timesteps {
        match dir {
            InternalDirection::UniFwd | InternalDirection::BidirFwd => Location::Output(0),
            InternalDirection::UniBwd => Location::Output(last * slot_bytes),
            InternalDirection::BidirBwd => Location::Output(last * 2 * slot_bytes + slot_bytes),
        }
    } else if timesteps == 1 {
        Location::Output(back_half_offset(dir, slot_bytes))
    } else {
        Location::Scratch { plane: 0, slot: 0 }
    }
}

/// First-iteration cell destination (four-gate cell only): scratch,
/// unless the single timestep writes the caller's buffer directly.
fn initial_cell_dest(dir: InternalDirection, timesteps: u32, slot_bytes: usize) -> Location {
    if timesteps == 1 {
        Location::Output(back_half_offset(dir, slot_bytes))
    } else {
        Location::Scratch { plane: 1, slot: 0 }
    }
}

/// The backward half of a bidirectional pair writes one slot into the
/// direction-concatenated output; everyone else starts at its beginning.
fn back_half_offset(dir: InternalDirection, slot_bytes: usize) -> usize {
    if dir == InternalDirection::BidirBwd {
        slot_bytes
    } else {
        0
    }
}

/// Next-iteration destination in final-only mode: switch to the caller's
/// buffer on the second-to-last iteration so the last activation writes
/// the true final result directly; otherwise alternate between the two
/// scratch slots on iteration parity.
fn next_final_only_dest(
    dir: InternalDirection,
    bounds: &LoopBounds,
    i: i64,
    c: usize,
    slot_bytes: usize,
    plane: usize,
) -> Location {
    if i + 2 * bounds.delta == bounds.end {
        Location::Output(back_half_offset(dir, slot_bytes))
    } else {
        Location::Scratch { plane, slot: !c & 1 }
    }
}

/// Next-iteration hidden destination.
fn advance_hidden_dest(
    current: Location,
    dir: InternalDirection,
    bounds: &LoopBounds,
    i: i64,
    c: usize,
    all_timesteps: bool,
    slot_bytes: usize,
) -> Location {
    if all_timesteps {
        match current {
            Location::Output(offset) => {
                let step = bounds.delta * bounds.shift as i64 * slot_bytes as i64;
                Location::Output((offset as i64 + step) as usize)
            }
            // All-timesteps destinations always live in the output buffer.
            other => other,
        }
    } else {
        next_final_only_dest(dir, bounds, i, c, slot_bytes, 0)
    }
}

/// Runs one direction's pass. Returns whether any primitive call flagged
/// an element range violation.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_direction<A: Accelerator>(
    accel: &A,
    precheck: bool,
    params: &RnnParams,
    dir: InternalDirection,
    input: TensorView<'_>,
    ins: &DirectionInputs<'_>,
    hn_output: TensorView<'_>,
    cf_output: Option<TensorView<'_>>,
    plan: &WorkAreaPlan,
    work: &mut [u8],
) -> Result<bool, RnnError> {
    let cell = params.cell;
    let ts = params.timesteps;
    let all_timesteps = hn_output.native().shape.dim4 == ts;
    let slot_bytes = plan.state_slot_bytes;
    let mut range_seen = false;

    tracing::debug!(
        "running {:?} pass: {} timesteps, {} output, {} byte work area",
        dir,
        ts,
        if all_timesteps { "all-timesteps" } else { "final-only" },
        work.len(),
    );

    // One raw view over this direction's work-area half; every scratch
    // view is carved from it at a plan offset. The plan keeps the
    // regions disjoint, and no primitive call ever receives overlapping
    // input and output ranges.
    //
    // SAFETY: slice pointers are non-null and valid for the slice
    // length; the exclusive borrow of `work` outlives every view carved
    // below, and nothing else aliases the work area during the pass.
    let work_view = unsafe {
        TensorView::from_raw_parts(
            plan.fused,
            NonNull::new_unchecked(work.as_mut_ptr()),
            work.len(),
        )
    };

    let fused = work_view.rebased(plan.fused_offset(), plan.fused)?;
    let bias_add_out = work_view.rebased(plan.bias_add_offset(), plan.bias_add)?;

    // One timestep's slice of the fused region, and the bias-add region
    // re-read per gate, both use the activation operand shape.
    let act_desc = NativeDesc::feature(params.gates, 1, params.batch, params.hidden);
    let ts_fused_bytes = plan.fused_bytes / ts as usize;
    let state_desc = plan.state_slot;

    fn resolve<'a>(
        loc: Location,
        initial: TensorView<'a>,
        out_buf: TensorView<'a>,
        work_view: TensorView<'a>,
        plan: &WorkAreaPlan,
        state_desc: NativeDesc,
    ) -> Result<TensorView<'a>, tensor_native::LayoutError> {
        match loc {
            Location::Initial => Ok(initial),
            Location::Output(offset) => out_buf.rebased(offset, state_desc),
            Location::Scratch { plane, slot } => {
                work_view.rebased(plan.scratch_offset(plane, slot), state_desc)
            }
        }
    }

    // Pre-loop: input-side pre-activations for every timestep at once.
    if precheck {
        verify::verify_matmul_call(true, &input, &ins.weights, &ins.biases, &fused)?;
    }
    let call = AccelCall::new(
        Opcode::MatmulOpBcast,
        [Some(input), Some(ins.weights), Some(ins.biases)],
        [Some(fused), None],
        ParamBlock::matmul(MatmulFusion::Addition),
    );
    range_seen |= accel.invoke_checked(&call)?.range_violation();

    let bounds = loop_bounds(dir, ts, all_timesteps);
    let mut prev_h = Location::Initial;
    let mut prev_c = Location::Initial;
    let mut h_dest = initial_hidden_dest(dir, ts, all_timesteps, slot_bytes);
    let mut c_dest = initial_cell_dest(dir, ts, slot_bytes);

    let mut i = bounds.start;
    let mut c: usize = 0;
    while i != bounds.end {
        let ts_fused = fused.rebased(i as usize * ts_fused_bytes, act_desc)?;
        let prev_h_view = resolve(prev_h, ins.h0, hn_output, work_view, plan, state_desc)?;

        // Hidden projection of the previous state.
        if precheck {
            verify::verify_matmul_call(
                false,
                &prev_h_view,
                &ins.hidden_weights,
                &ins.hidden_biases,
                &bias_add_out,
            )?;
        }
        let call = AccelCall::new(
            Opcode::MatmulOp,
            [
                Some(prev_h_view),
                Some(ins.hidden_weights),
                Some(ins.hidden_biases),
            ],
            [Some(bias_add_out), None],
            ParamBlock::matmul(MatmulFusion::Addition),
        );
        range_seen |= accel.invoke_checked(&call)?.range_violation();

        // Gate activation into this iteration's destinations.
        let bias_add_act = bias_add_out.with_desc(act_desc)?;
        let (prev_state_view, c_out_view) = if cell.has_cell_state() {
            let c0 = ins.c0.expect("four-gate direction inputs carry c0");
            let cf = cf_output.expect("four-gate call carries cf_output");
            (
                resolve(prev_c, c0, cf, work_view, plan, state_desc)?,
                Some(resolve(c_dest, c0, cf, work_view, plan, state_desc)?),
            )
        } else {
            (prev_h_view, None)
        };
        let h_out_view = resolve(h_dest, ins.h0, hn_output, work_view, plan, state_desc)?;
        if precheck {
            verify::verify_activation_call(
                cell,
                &ts_fused,
                &bias_add_act,
                &prev_state_view,
                &h_out_view,
                c_out_view.as_ref(),
            )?;
        }
        let call = AccelCall::new(
            Opcode::activation(cell),
            [Some(ts_fused), Some(bias_add_act), Some(prev_state_view)],
            [Some(h_out_view), c_out_view],
            ParamBlock::none(),
        );
        range_seen |= accel.invoke_checked(&call)?.range_violation();

        // Re-bind the previous state to what was just written (no copy),
        // then move the destinations for the next iteration.
        prev_h = h_dest;
        if cell.has_cell_state() {
            prev_c = c_dest;
        }
        if i + bounds.delta != bounds.end {
            h_dest = advance_hidden_dest(h_dest, dir, &bounds, i, c, all_timesteps, slot_bytes);
            if cell.has_cell_state() {
                c_dest = next_final_only_dest(dir, &bounds, i, c, slot_bytes, 1);
            }
        }

        i += bounds.delta;
        c += 1;
    }

    Ok(range_seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_bounds_forward() {
        let b = loop_bounds(InternalDirection::UniFwd, 5, true);
        assert_eq!(b, LoopBounds { start: 0, end: 5, delta: 1, shift: 1 });
        let b = loop_bounds(InternalDirection::BidirFwd, 5, true);
        assert_eq!(b.shift, 2);
    }

    #[test]
    fn test_loop_bounds_backward() {
        let b = loop_bounds(InternalDirection::UniBwd, 5, true);
        assert_eq!(b, LoopBounds { start: 4, end: -1, delta: -1, shift: 1 });
        let b = loop_bounds(InternalDirection::BidirBwd, 5, false);
        assert_eq!(b.shift, 0);
    }

    #[test]
    fn test_initial_hidden_dest_all_timesteps() {
        // Forward starts at slot 0; backward at the last slot so results
        // land in input-timestep order.
        assert_eq!(
            initial_hidden_dest(InternalDirection::UniFwd, 5, true, 4096),
            Location::Output(0)
        );
        assert_eq!(
            initial_hidden_dest(InternalDirection::UniBwd, 5, true, 4096),
            Location::Output(4 * 4096)
        );
        // The backward half of a bidir pair owns every second slot,
        // offset one slot into the interleaved rows.
        assert_eq!(
            initial_hidden_dest(InternalDirection::BidirBwd, 5, true, 4096),
            Location::Output(4 * 2 * 4096 + 4096)
        );
    }

    #[test]
    fn test_initial_dest_single_timestep_goes_direct() {
        for dir in [
            InternalDirection::UniFwd,
            InternalDirection::UniBwd,
            InternalDirection::BidirFwd,
        ] {
            assert_eq!(
                initial_hidden_dest(dir, 1, false, 4096),
                Location::Output(0)
            );
            assert_eq!(initial_cell_dest(dir, 1, 4096), Location::Output(0));
        }
        assert_eq!(
            initial_hidden_dest(InternalDirection::BidirBwd, 1, false, 4096),
            Location::Output(4096)
        );
        assert_eq!(
            initial_cell_dest(InternalDirection::BidirBwd, 1, 4096),
            Location::Output(4096)
        );
    }

    #[test]
    fn test_final_only_ping_pong_parity() {
        // ts=5 forward: destinations after iterations 0..3 alternate
        // slots 1, 0, then switch to the output on the second-to-last.
        let b = loop_bounds(InternalDirection::UniFwd, 5, false);
        assert_eq!(
            next_final_only_dest(InternalDirection::UniFwd, &b, 0, 0, 4096, 0),
            Location::Scratch { plane: 0, slot: 1 }
        );
        assert_eq!(
            next_final_only_dest(InternalDirection::UniFwd, &b, 1, 1, 4096, 0),
            Location::Scratch { plane: 0, slot: 0 }
        );
        assert_eq!(
            next_final_only_dest(InternalDirection::UniFwd, &b, 2, 2, 4096, 0),
            Location::Scratch { plane: 0, slot: 1 }
        );
        // i=3 is second-to-last (3 + 2 == 5): the next (last) iteration
        // writes the caller's buffer.
        assert_eq!(
            next_final_only_dest(InternalDirection::UniFwd, &b, 3, 3, 4096, 0),
            Location::Output(0)
        );
    }

    #[test]
    fn test_final_only_backward_switch() {
        let b = loop_bounds(InternalDirection::BidirBwd, 3, false);
        // i=1 is second-to-last going backward (1 - 2 == -1).
        assert_eq!(
            next_final_only_dest(InternalDirection::BidirBwd, &b, 1, 1, 4096, 1),
            Location::Output(4096)
        );
        assert_eq!(
            next_final_only_dest(InternalDirection::BidirBwd, &b, 2, 0, 4096, 1),
            Location::Scratch { plane: 1, slot: 1 }
        );
    }

    #[test]
    fn test_advance_hidden_all_timesteps_steps_in_processing_order() {
        let b = loop_bounds(InternalDirection::UniBwd, 5, true);
        // Backward: offsets walk down toward the start of the output.
        let d0 = initial_hidden_dest(InternalDirection::UniBwd, 5, true, 4096);
        let d1 = advance_hidden_dest(d0, InternalDirection::UniBwd, &b, 4, 0, true, 4096);
        assert_eq!(d1, Location::Output(3 * 4096));
        let d2 = advance_hidden_dest(d1, InternalDirection::UniBwd, &b, 3, 1, true, 4096);
        assert_eq!(d2, Location::Output(2 * 4096));
    }

    #[test]
    fn test_advance_hidden_bidir_steps_two_slots() {
        let b = loop_bounds(InternalDirection::BidirFwd, 4, true);
        let d0 = initial_hidden_dest(InternalDirection::BidirFwd, 4, true, 4096);
        let d1 = advance_hidden_dest(d0, InternalDirection::BidirFwd, &b, 0, 0, true, 4096);
        assert_eq!(d1, Location::Output(2 * 4096));
    }
}
