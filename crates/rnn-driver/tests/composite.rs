// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: full composite calls over a scripted in-memory
//! accelerator.
//!
//! The mock backend records every primitive call (opcode, operand
//! shapes, operand addresses) and writes recognisable byte patterns into
//! the output buffers: the fused pre-activation of timestep `t` is
//! tagged with `t`'s input tag, the gate activation copies its fused
//! tag into the hidden output, and each direction's fused pass adds a
//! direction offset. That makes output placement, processing order, and
//! buffer chaining all observable from the outside, without modelling
//! any arithmetic.

use std::cell::{Cell, RefCell};

use accel_call::{
    AccelCall, AccelError, Accelerator, Capabilities, InvokeOutcome, Opcode,
    RANGE_VIOLATION_FLAG,
};
use rnn_driver::{Direction, EngineConfig, RnnEngine, RnnError};
use tensor_native::{
    padded_width, CellKind, ConcatInfo, ConcatUsage, LogicalLayout, LogicalShape, NativeShape,
    PrevLayer, Tensor, TensorView,
};
use work_area::{WorkArea, WorkAreaPlan};

/// First timestep's tag byte; timestep `t` is tagged `TAG0 + t`.
const TAG0: u8 = 1;
/// Added to every tag by the second direction's fused pass.
const DIR_STEP: u8 = 0x40;
/// Added to cell-state outputs so they differ from hidden outputs.
const CELL_STEP: u8 = 0x20;

#[derive(Debug, Clone, Copy)]
struct Operand {
    shape: NativeShape,
    addr: usize,
    bytes: usize,
}

impl Operand {
    fn of(view: &TensorView<'_>) -> Self {
        Self {
            shape: view.native().shape,
            addr: view.as_ptr().as_ptr() as usize,
            bytes: view.byte_size(),
        }
    }
}

#[derive(Debug, Clone)]
struct RecordedCall {
    opcode: Opcode,
    inputs: Vec<Operand>,
    outputs: Vec<Operand>,
}

/// Scripted accelerator: records calls, writes tag patterns, and can
/// inject a failure or a range-violation warning at a given call index.
#[derive(Default)]
struct MockAccel {
    calls: RefCell<Vec<RecordedCall>>,
    fail_at: Cell<Option<usize>>,
    range_at: Cell<Option<usize>>,
    fused_passes: Cell<u8>,
}

impl MockAccel {
    fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    fn activations(&self) -> Vec<RecordedCall> {
        self.recorded()
            .into_iter()
            .filter(|c| matches!(c.opcode, Opcode::LstmAct | Opcode::GruAct))
            .collect()
    }
}

fn fill_bytes(addr: usize, len: usize, byte: u8) {
    // SAFETY: the runtime hands the backend exclusive output views for
    // the duration of the call; addr/len come from such a view.
    unsafe {
        std::slice::from_raw_parts_mut(addr as *mut u8, len).fill(byte);
    }
}

fn fill(view: &TensorView<'_>, byte: u8) {
    fill_bytes(view.as_ptr().as_ptr() as usize, view.byte_size(), byte);
}

fn read_byte(addr: usize) -> u8 {
    // SAFETY: addr was recorded from a live view during this test.
    unsafe { *(addr as *const u8) }
}

impl Accelerator for MockAccel {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn invoke(&self, call: &AccelCall<'_>) -> Result<InvokeOutcome, AccelError> {
        let index = self.calls.borrow().len();
        self.calls.borrow_mut().push(RecordedCall {
            opcode: call.opcode,
            inputs: call.inputs().map(Operand::of).collect(),
            outputs: call.outputs().map(Operand::of).collect(),
        });

        if self.fail_at.get() == Some(index) {
            return Err(AccelError::ResponseCode { code: 0xF002 });
        }

        let inputs: Vec<TensorView<'_>> = call.inputs().copied().collect();
        let outputs: Vec<TensorView<'_>> = call.outputs().copied().collect();
        match call.opcode {
            Opcode::MatmulOpBcast => {
                // Tag each output plane with its input plane's tag plus
                // the direction offset.
                let dir_tag = self.fused_passes.get().wrapping_mul(DIR_STEP);
                self.fused_passes.set(self.fused_passes.get() + 1);
                let rows = outputs[0].native().shape.dim4 as usize;
                let in_row = inputs[0].byte_size() / rows;
                let out_row = outputs[0].byte_size() / rows;
                let in_base = inputs[0].as_ptr().as_ptr() as usize;
                let out_base = outputs[0].as_ptr().as_ptr() as usize;
                for t in 0..rows {
                    let tag = read_byte(in_base + t * in_row).wrapping_add(dir_tag);
                    fill_bytes(out_base + t * out_row, out_row, tag);
                }
            }
            Opcode::MatmulOp => {
                // Hidden projection: carry the previous state's tag.
                let tag = read_byte(inputs[0].as_ptr().as_ptr() as usize);
                fill(&outputs[0], tag);
            }
            Opcode::LstmAct | Opcode::GruAct => {
                // Hidden output takes the fused slice's tag; cell output
                // takes it shifted so the two are distinguishable.
                let tag = read_byte(inputs[0].as_ptr().as_ptr() as usize);
                fill(&outputs[0], tag);
                if let Some(c_out) = outputs.get(1) {
                    fill(c_out, tag.wrapping_add(CELL_STEP));
                }
            }
        }

        let flags = if self.range_at.get() == Some(index) {
            RANGE_VIOLATION_FLAG
        } else {
            0
        };
        Ok(InvokeOutcome::with_flags(flags))
    }
}

// ── Tensor set helpers ─────────────────────────────────────────

struct RnnSet {
    input: Tensor,
    h0: Tensor,
    c0: Option<Tensor>,
    weights: Tensor,
    biases: Tensor,
    hidden_weights: Tensor,
    hidden_biases: Tensor,
}

fn plain(layout: LogicalLayout, dims: Vec<u32>) -> Tensor {
    Tensor::new(LogicalShape::new(layout, dims).unwrap()).unwrap()
}

/// Builds a valid input set with the input rows tagged `TAG0 + t`.
fn rnn_set(cell: CellKind, ts: u32, batch: u32, features: u32, hidden: u32, dirs: u32) -> RnnSet {
    let mut input = plain(LogicalLayout::TimeMajor3d, vec![ts, batch, features]);
    let row = input.native().byte_size() / ts as usize;
    for t in 0..ts as usize {
        input.as_bytes_mut()[t * row..(t + 1) * row].fill(TAG0 + t as u8);
    }

    let concat = |usage, dims: Vec<u32>, layout| {
        Tensor::concatenated(
            LogicalShape::new(layout, dims).unwrap(),
            ConcatInfo::new(cell, usage, PrevLayer::Uni),
        )
        .unwrap()
    };

    RnnSet {
        input,
        h0: plain(LogicalLayout::State3d, vec![dirs, batch, hidden]),
        c0: cell
            .has_cell_state()
            .then(|| plain(LogicalLayout::State3d, vec![dirs, batch, hidden])),
        weights: concat(
            ConcatUsage::Weights,
            vec![dirs, features, hidden],
            LogicalLayout::WeightsConcat3d,
        ),
        biases: concat(
            ConcatUsage::Biases,
            vec![dirs, hidden],
            LogicalLayout::BiasesConcat2d,
        ),
        hidden_weights: concat(
            ConcatUsage::HiddenWeights,
            vec![dirs, hidden, hidden],
            LogicalLayout::WeightsConcat3d,
        ),
        hidden_biases: concat(
            ConcatUsage::HiddenBiases,
            vec![dirs, hidden],
            LogicalLayout::BiasesConcat2d,
        ),
    }
}

fn output(rows: u32, batch: u32, width: u32) -> Tensor {
    plain(LogicalLayout::TimeMajor3d, vec![rows, batch, width])
}

fn engine() -> RnnEngine<MockAccel> {
    RnnEngine::new(MockAccel::default(), EngineConfig::default())
}

fn run_gru(
    engine: &RnnEngine<MockAccel>,
    set: &RnnSet,
    direction: Direction,
    work: Option<&mut [u8]>,
    hn: &mut Tensor,
) -> Result<rnn_driver::RnnOutcome, RnnError> {
    engine.gru(
        &set.input,
        &set.h0,
        &set.weights,
        &set.biases,
        &set.hidden_weights,
        &set.hidden_biases,
        direction,
        work,
        hn,
    )
}

fn run_lstm(
    engine: &RnnEngine<MockAccel>,
    set: &RnnSet,
    direction: Direction,
    work: Option<&mut [u8]>,
    hn: &mut Tensor,
    cf: &mut Tensor,
) -> Result<rnn_driver::RnnOutcome, RnnError> {
    engine.lstm(
        &set.input,
        &set.h0,
        set.c0.as_ref().unwrap(),
        &set.weights,
        &set.biases,
        &set.hidden_weights,
        &set.hidden_biases,
        direction,
        work,
        hn,
        cf,
    )
}

/// First byte of output slot `i`, where slots are `slot_bytes` apart.
fn slot_byte(t: &Tensor, i: usize, slot_bytes: usize) -> u8 {
    t.as_bytes()[i * slot_bytes]
}

// ── Schedules and contents ─────────────────────────────────────

#[test]
fn test_gru_forward_all_timesteps() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 5, 2, 16, 16, 1);
    let mut hn = output(5, 2, 16);

    let outcome = run_gru(&engine, &set, Direction::Forward, None, &mut hn).unwrap();
    assert!(!outcome.range_violation);
    assert!(hn.is_ready());

    // One fused broadcast plus matmul+activation per timestep.
    let calls = engine.accelerator().recorded();
    assert_eq!(calls.len(), 1 + 2 * 5);
    assert_eq!(calls[0].opcode, Opcode::MatmulOpBcast);
    assert_eq!(calls[1].opcode, Opcode::MatmulOp);
    assert_eq!(calls[2].opcode, Opcode::GruAct);

    // Slot i carries timestep i's tag.
    let slot = 4096; // (1, 1, 2, 16)
    for t in 0..5 {
        assert_eq!(slot_byte(&hn, t, slot), TAG0 + t as u8);
    }
}

#[test]
fn test_backward_output_matches_input_order() {
    // Processing order reverses; output slot order must not.
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 5, 2, 16, 16, 1);
    let mut hn = output(5, 2, 16);

    run_gru(&engine, &set, Direction::Backward, None, &mut hn).unwrap();

    let slot = 4096;
    for t in 0..5 {
        assert_eq!(slot_byte(&hn, t, slot), TAG0 + t as u8);
    }

    // The activation destinations walked backward through the buffer.
    let acts = engine.accelerator().activations();
    let base = hn.as_bytes().as_ptr() as usize;
    let addrs: Vec<usize> = acts.iter().map(|c| c.outputs[0].addr - base).collect();
    assert_eq!(addrs, vec![4 * slot, 3 * slot, 2 * slot, slot, 0]);
}

#[test]
fn test_single_timestep_writes_output_directly() {
    // With one timestep there is no scratch: the only activation writes
    // the caller's buffers.
    let engine = engine();
    let set = rnn_set(CellKind::Lstm, 1, 4, 32, 16, 1);
    let mut hn = output(1, 4, 16);
    let mut cf = output(1, 4, 16);

    let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 1, 4, 16, 256);
    assert_eq!(plan.scratch_slots, 0);
    let mut area = WorkArea::allocate(plan.total_bytes(1)).unwrap();

    run_lstm(
        &engine,
        &set,
        Direction::Forward,
        Some(area.as_mut_slice()),
        &mut hn,
        &mut cf,
    )
    .unwrap();

    let acts = engine.accelerator().activations();
    assert_eq!(acts.len(), 1);
    assert_eq!(acts[0].outputs[0].addr, hn.as_bytes().as_ptr() as usize);
    assert_eq!(acts[0].outputs[1].addr, cf.as_bytes().as_ptr() as usize);
    assert_eq!(hn.as_bytes()[0], TAG0);
    assert_eq!(cf.as_bytes()[0], TAG0 + CELL_STEP);
}

#[test]
fn test_final_only_ping_pong() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 4, 2, 16, 16, 1);
    let mut hn = output(1, 2, 16);

    let plan = WorkAreaPlan::for_direction(CellKind::Gru, 4, 2, 16, 192);
    let mut area = WorkArea::allocate(plan.total_bytes(1)).unwrap();
    let work_base = area.as_mut_slice().as_ptr() as usize;

    run_gru(
        &engine,
        &set,
        Direction::Forward,
        Some(area.as_mut_slice()),
        &mut hn,
    )
    .unwrap();

    // Destinations: scratch slot 0, slot 1, slot 0, then the caller's
    // buffer for the last timestep.
    let acts = engine.accelerator().activations();
    let slot0 = work_base + plan.scratch_offset(0, 0);
    let slot1 = work_base + plan.scratch_offset(0, 1);
    let addrs: Vec<usize> = acts.iter().map(|c| c.outputs[0].addr).collect();
    assert_eq!(
        addrs,
        vec![slot0, slot1, slot0, hn.as_bytes().as_ptr() as usize]
    );

    // Each step reads the state the previous step wrote, at a different
    // address than it writes (the hardware forbids overlap).
    for (k, act) in acts.iter().enumerate() {
        let prev = act.inputs[2];
        if k == 0 {
            assert_eq!(prev.addr, set.h0.as_bytes().as_ptr() as usize);
        } else {
            assert_eq!(prev.addr, acts[k - 1].outputs[0].addr);
        }
        assert_ne!(prev.addr, act.outputs[0].addr);
    }

    // Final result reaches the caller.
    assert_eq!(hn.as_bytes()[0], TAG0 + 3);
}

#[test]
fn test_lstm_final_only_uses_separate_planes() {
    let engine = engine();
    let set = rnn_set(CellKind::Lstm, 3, 4, 32, 16, 1);
    let mut hn = output(1, 4, 16);
    let mut cf = output(1, 4, 16);

    let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
    assert_eq!(plan.direction_bytes(), 81920);
    let mut area = WorkArea::allocate(plan.total_bytes(1)).unwrap();
    let work_base = area.as_mut_slice().as_ptr() as usize;

    run_lstm(
        &engine,
        &set,
        Direction::Forward,
        Some(area.as_mut_slice()),
        &mut hn,
        &mut cf,
    )
    .unwrap();

    let acts = engine.accelerator().activations();
    let h_addrs: Vec<usize> = acts.iter().map(|c| c.outputs[0].addr).collect();
    let c_addrs: Vec<usize> = acts.iter().map(|c| c.outputs[1].addr).collect();
    assert_eq!(
        h_addrs,
        vec![
            work_base + plan.scratch_offset(0, 0),
            work_base + plan.scratch_offset(0, 1),
            hn.as_bytes().as_ptr() as usize,
        ]
    );
    assert_eq!(
        c_addrs,
        vec![
            work_base + plan.scratch_offset(1, 0),
            work_base + plan.scratch_offset(1, 1),
            cf.as_bytes().as_ptr() as usize,
        ]
    );

    // Cell state chains through its own plane.
    assert_eq!(
        acts[0].inputs[2].addr,
        set.c0.as_ref().unwrap().as_bytes().as_ptr() as usize
    );
    assert_eq!(acts[1].inputs[2].addr, acts[0].outputs[1].addr);
    assert_eq!(acts[2].inputs[2].addr, acts[1].outputs[1].addr);

    assert_eq!(hn.as_bytes()[0], TAG0 + 2);
    assert_eq!(cf.as_bytes()[0], TAG0 + 2 + CELL_STEP);
}

#[test]
fn test_lstm_all_timesteps_keeps_hidden_in_output() {
    // All-timesteps mode writes hidden results straight into the output
    // slots and chains the previous state through them.
    let engine = engine();
    let set = rnn_set(CellKind::Lstm, 3, 4, 32, 16, 1);
    let mut hn = output(3, 4, 16);
    let mut cf = output(1, 4, 16);

    run_lstm(&engine, &set, Direction::Forward, None, &mut hn, &mut cf).unwrap();

    let base = hn.as_bytes().as_ptr() as usize;
    let acts = engine.accelerator().activations();
    let h_addrs: Vec<usize> = acts.iter().map(|c| c.outputs[0].addr - base).collect();
    assert_eq!(h_addrs, vec![0, 4096, 2 * 4096]);

    // Hidden projections read h0 first, then the previous output slot.
    let matmuls: Vec<RecordedCall> = engine
        .accelerator()
        .recorded()
        .into_iter()
        .filter(|c| c.opcode == Opcode::MatmulOp)
        .collect();
    assert_eq!(
        matmuls[0].inputs[0].addr,
        set.h0.as_bytes().as_ptr() as usize
    );
    assert_eq!(matmuls[1].inputs[0].addr, base);
    assert_eq!(matmuls[2].inputs[0].addr, base + 4096);
}

// ── Bidirectional ──────────────────────────────────────────────

#[test]
fn test_bidirectional_interleave_and_disjoint_halves() {
    let engine = engine();
    let set = rnn_set(CellKind::Lstm, 3, 4, 32, 16, 2);
    let out_pad = 2 * padded_width(16);
    let mut hn = output(3, 4, out_pad);
    let mut cf = output(1, 4, out_pad);

    let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
    let half = plan.direction_bytes();
    assert_eq!(half, 81920);
    let mut area = WorkArea::allocate(plan.total_bytes(2)).unwrap();
    area.as_mut_slice().fill(0xEE);
    let work_base = area.as_mut_slice().as_ptr() as usize;

    run_lstm(
        &engine,
        &set,
        Direction::Bidirectional,
        Some(area.as_mut_slice()),
        &mut hn,
        &mut cf,
    )
    .unwrap();

    // Two full passes: (1 + 2·3) calls each.
    let calls = engine.accelerator().recorded();
    assert_eq!(calls.len(), 14);

    // Every work-area write of the forward pass lands in the first
    // half, every one of the backward pass in the second — the halves
    // never contaminate each other.
    let work_range = work_base..work_base + 2 * half;
    for (index, call) in calls.iter().enumerate() {
        let expected = if index < 7 {
            work_base..work_base + half
        } else {
            work_base + half..work_base + 2 * half
        };
        for out in &call.outputs {
            if work_range.contains(&out.addr) {
                assert!(
                    expected.contains(&out.addr)
                        && expected.contains(&(out.addr + out.bytes - 1)),
                    "call {index} wrote outside its direction's half",
                );
            }
        }
    }

    // Interleaved output rows: [fwd t | bwd t] per timestep, with the
    // backward pass carrying the direction offset.
    let slot = 4096;
    for t in 0..3u8 {
        let row = t as usize * 2 * slot;
        assert_eq!(hn.as_bytes()[row], TAG0 + t);
        assert_eq!(hn.as_bytes()[row + slot], TAG0 + t + DIR_STEP);
    }

    // Final cell states: forward's last timestep in the front half,
    // backward's (timestep 0) in the back half.
    assert_eq!(cf.as_bytes()[0], TAG0 + 2 + CELL_STEP);
    assert_eq!(cf.as_bytes()[slot], TAG0 + DIR_STEP + CELL_STEP);
}

#[test]
fn test_bidirectional_weight_slicing() {
    // Each pass must see its own direction's weight slice.
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 2, 2, 16, 16, 2);
    let mut hn = output(2, 2, 2 * padded_width(16));

    run_gru(&engine, &set, Direction::Bidirectional, None, &mut hn).unwrap();

    let calls = engine.accelerator().recorded();
    let w_base = set.weights.as_bytes().as_ptr() as usize;
    let w_half = set.weights.native().byte_size() / 2;
    // Fused broadcast calls are at indices 0 and 5 (1 + 2·2 per pass).
    assert_eq!(calls[0].inputs[1].addr, w_base);
    assert_eq!(calls[5].inputs[1].addr, w_base + w_half);
    // The sliced views present a single direction plane.
    assert_eq!(calls[0].inputs[1].shape.dim4, 1);
}

// ── Work-area acquisition ──────────────────────────────────────

#[test]
fn test_caller_buffer_too_small() {
    let engine = engine();
    let set = rnn_set(CellKind::Lstm, 3, 4, 32, 16, 1);
    let mut hn = output(3, 4, 16);
    let mut cf = output(1, 4, 16);

    let mut area = WorkArea::allocate(4096).unwrap();
    let err = run_lstm(
        &engine,
        &set,
        Direction::Forward,
        Some(area.as_mut_slice()),
        &mut hn,
        &mut cf,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RnnError::WorkArea(work_area::WorkAreaError::BufferTooSmall {
            required: 81920,
            found: 4096,
        })
    ));
    // Rejected before any hardware call.
    assert_eq!(engine.accelerator().recorded().len(), 0);
}

#[test]
fn test_caller_buffer_misaligned() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 2, 2, 16, 16, 1);
    let mut hn = output(2, 2, 16);

    let mut area = WorkArea::allocate(200000).unwrap();
    let err = run_gru(
        &engine,
        &set,
        Direction::Forward,
        Some(&mut area.as_mut_slice()[1..]),
        &mut hn,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RnnError::WorkArea(work_area::WorkAreaError::Misaligned { .. })
    ));
}

// ── Failure semantics ──────────────────────────────────────────

#[test]
fn test_failure_stops_the_sequence() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 5, 2, 16, 16, 1);
    let mut hn = output(5, 2, 16);

    // Fail the fifth primitive call (second timestep's activation).
    engine.accelerator().fail_at.set(Some(4));
    let err = run_gru(&engine, &set, Direction::Forward, None, &mut hn).unwrap_err();

    // The exact status comes back unchanged, and nothing further was
    // issued: the failing call is the last one recorded.
    assert!(matches!(
        err,
        RnnError::Accel(AccelError::ResponseCode { code: 0xF002 })
    ));
    assert_eq!(engine.accelerator().recorded().len(), 5);
    assert!(!hn.is_ready());
}

#[test]
fn test_failure_in_fused_matmul_stops_immediately() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 5, 2, 16, 16, 1);
    let mut hn = output(5, 2, 16);

    engine.accelerator().fail_at.set(Some(0));
    run_gru(&engine, &set, Direction::Forward, None, &mut hn).unwrap_err();
    assert_eq!(engine.accelerator().recorded().len(), 1);
}

#[test]
fn test_failure_in_first_direction_skips_second() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 3, 2, 16, 16, 2);
    let mut hn = output(3, 2, 2 * padded_width(16));

    engine.accelerator().fail_at.set(Some(2));
    run_gru(&engine, &set, Direction::Bidirectional, None, &mut hn).unwrap_err();
    // 3 calls from the forward pass, none from the backward pass.
    assert_eq!(engine.accelerator().recorded().len(), 3);
}

#[test]
fn test_range_violation_is_warning_not_abort() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 3, 2, 16, 16, 1);
    let mut hn = output(3, 2, 16);

    engine.accelerator().range_at.set(Some(3));
    let outcome = run_gru(&engine, &set, Direction::Forward, None, &mut hn).unwrap();

    // The warning surfaces, the sequence ran to completion, and the
    // outputs are usable.
    assert!(outcome.range_violation);
    assert_eq!(engine.accelerator().recorded().len(), 7);
    assert!(hn.is_ready());
    assert_eq!(hn.as_bytes()[2 * 4096], TAG0 + 2);
}

// ── Verification gate ──────────────────────────────────────────

#[test]
fn test_verifier_rejects_before_any_hardware_call() {
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 3, 2, 16, 16, 1);
    // Batch-mismatched hidden state.
    let bad_h0 = plain(LogicalLayout::State3d, vec![1, 7, 16]);
    let mut hn = output(3, 2, 16);

    let err = engine
        .gru(
            &set.input,
            &bad_h0,
            &set.weights,
            &set.biases,
            &set.hidden_weights,
            &set.hidden_biases,
            Direction::Forward,
            None,
            &mut hn,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RnnError::InvalidShape {
            tensor: "h0",
            dim: 2,
            ..
        }
    ));
    assert_eq!(engine.accelerator().recorded().len(), 0);
    assert!(!hn.is_ready());
}

#[test]
fn test_per_call_operand_shapes() {
    // The internal views the scheduler builds carry the documented
    // operand shapes.
    let engine = engine();
    let set = rnn_set(CellKind::Gru, 3, 2, 16, 16, 1);
    let mut hn = output(3, 2, 16);
    run_gru(&engine, &set, Direction::Forward, None, &mut hn).unwrap();

    let calls = engine.accelerator().recorded();
    // Fused broadcast: (ts,1,b,f) × (1,1,f,in_pad) → (ts,1,b,in_pad).
    assert_eq!(calls[0].outputs[0].shape, NativeShape::new(3, 1, 2, 192));
    // Hidden projection output: (1,1,b,in_pad).
    assert_eq!(calls[1].outputs[0].shape, NativeShape::new(1, 1, 2, 192));
    // Activation operands: (g,1,b,s) fused and bias-add views.
    assert_eq!(calls[2].inputs[0].shape, NativeShape::new(3, 1, 2, 16));
    assert_eq!(calls[2].inputs[1].shape, NativeShape::new(3, 1, 2, 16));
    assert_eq!(calls[2].outputs[0].shape, NativeShape::new(1, 1, 2, 16));
}
