// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Work-area planning: the exact size and sub-layout of the scratch
//! region one processing direction needs, computed without allocating.
//!
//! ```text
//! one direction's work area ----------------------
//! |  fused      <ts 0 / ts 1 / ...>              |
//! +----------------------------------------------
//! |  bias-add                                    |
//! +----------------------------------------------
//! |  hidden scratch slot 0                       |
//! |  hidden scratch slot 1            <alt>      |
//! +----------------------------------------------
//! |  cell scratch slot 0    (4-gate cell only)   |
//! |  cell scratch slot 1    (4-gate cell only)   |
//! ------------------------------------------------
//! ```
//!
//! The plan is the contract between the composite driver (which sizes
//! and acquires the buffer) and the directional scheduler (which places
//! scratch views inside it without any further size computation).

use tensor_native::{CellKind, NativeDesc};

/// The scratch-region layout for **one** processing direction.
///
/// A bidirectional call uses two of these regions back to back — one
/// full region per direction, each pass confined to its own half.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkAreaPlan {
    /// Holds every timestep's input-side pre-activation
    /// `(ts, 1, batch, gates·padded_hidden)`, filled once per direction
    /// by the broadcast matmul before the timestep loop.
    pub fused: NativeDesc,
    /// One timestep's hidden-projection result
    /// `(1, 1, batch, gates·padded_hidden)`, overwritten every iteration.
    pub bias_add: NativeDesc,
    /// One timestep's hidden (or cell) state `(1, 1, batch, hidden)`.
    pub state_slot: NativeDesc,
    /// Byte size of the fused region.
    pub fused_bytes: usize,
    /// Byte size of the bias-add region.
    pub bias_add_bytes: usize,
    /// Byte size of one state slot.
    pub state_slot_bytes: usize,
    /// Ping-pong slots allocated per state plane: `min(timesteps − 1, 2)`.
    ///
    /// With one timestep the caller's output buffer is used directly and
    /// no scratch is needed; with two timesteps one slot suffices; from
    /// three timesteps on, two slots alternate, because a call's input
    /// and output addresses must not overlap while each step reads the
    /// previous step's freshly written state.
    pub scratch_slots: usize,
    /// State planes: 2 for the four-gate cell (hidden and cell state
    /// each get their own slots), 1 for the three-gate cell.
    pub state_planes: usize,
}

impl WorkAreaPlan {
    /// Computes the plan for one direction of a recurrent call.
    ///
    /// `gate_width_total` is the concatenated weight width
    /// `gates · padded_width(hidden)`, taken from the (already verified)
    /// weight tensor.
    pub fn for_direction(
        cell: CellKind,
        timesteps: u32,
        batch: u32,
        hidden: u32,
        gate_width_total: u32,
    ) -> Self {
        let fused = NativeDesc::feature(timesteps, 1, batch, gate_width_total);
        let bias_add = NativeDesc::feature(1, 1, batch, gate_width_total);
        let state_slot = NativeDesc::feature(1, 1, batch, hidden);

        let plan = Self {
            fused,
            bias_add,
            state_slot,
            fused_bytes: fused.byte_size(),
            bias_add_bytes: bias_add.byte_size(),
            state_slot_bytes: state_slot.byte_size(),
            scratch_slots: (timesteps.saturating_sub(1)).min(2) as usize,
            state_planes: if cell.has_cell_state() { 2 } else { 1 },
        };
        tracing::debug!("work area plan: {}", plan.summary());
        plan
    }

    /// Total bytes one direction's pass needs.
    pub fn direction_bytes(&self) -> usize {
        self.fused_bytes
            + self.bias_add_bytes
            + self.state_slot_bytes * self.scratch_slots * self.state_planes
    }

    /// Total bytes for the whole composite call (`directions` is 1 or 2).
    pub fn total_bytes(&self, directions: u32) -> usize {
        self.direction_bytes() * directions as usize
    }

    /// Byte offset of the fused region within one direction's area.
    pub fn fused_offset(&self) -> usize {
        0
    }

    /// Byte offset of the bias-add region within one direction's area.
    pub fn bias_add_offset(&self) -> usize {
        self.fused_bytes
    }

    /// Byte offset of scratch slot `slot` of state plane `plane`
    /// (plane 0 = hidden, plane 1 = cell) within one direction's area.
    pub fn scratch_offset(&self, plane: usize, slot: usize) -> usize {
        debug_assert!(plane < self.state_planes);
        self.fused_bytes
            + self.bias_add_bytes
            + (plane * self.scratch_slots + slot) * self.state_slot_bytes
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        format!(
            "fused {} B + bias-add {} B + {} slot(s) × {} plane(s) × {} B = {} B/direction",
            self.fused_bytes,
            self.bias_add_bytes,
            self.scratch_slots,
            self.state_planes,
            self.state_slot_bytes,
            self.direction_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sizes_lstm() {
        // 4-gate cell, ts=3, b=4, hidden=16 → padded 64, gate width 256.
        let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
        assert_eq!(plan.fused_bytes, 49152);
        assert_eq!(plan.bias_add_bytes, 16384);
        assert_eq!(plan.state_slot_bytes, 4096);
        assert_eq!(plan.scratch_slots, 2);
        assert_eq!(plan.state_planes, 2);
        assert_eq!(plan.direction_bytes(), 81920);
        assert_eq!(plan.total_bytes(2), 163840);
    }

    #[test]
    fn test_gru_single_plane() {
        let plan = WorkAreaPlan::for_direction(CellKind::Gru, 3, 4, 16, 192);
        assert_eq!(plan.state_planes, 1);
        // fused (3,1,4,192) = 3·3·4096, bias-add 3·4096, 2 slots.
        assert_eq!(plan.direction_bytes(), 36864 + 12288 + 2 * 4096);
    }

    #[test]
    fn test_scratch_slot_count() {
        for (ts, slots) in [(1, 0), (2, 1), (3, 2), (4, 2), (100, 2)] {
            let plan = WorkAreaPlan::for_direction(CellKind::Gru, ts, 1, 16, 192);
            assert_eq!(plan.scratch_slots, slots, "timesteps={ts}");
        }
    }

    #[test]
    fn test_single_timestep_has_no_scratch() {
        let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 1, 4, 16, 256);
        assert_eq!(plan.scratch_slots, 0);
        assert_eq!(
            plan.direction_bytes(),
            plan.fused_bytes + plan.bias_add_bytes
        );
    }

    #[test]
    fn test_offsets_are_disjoint_and_ordered() {
        let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 5, 4, 16, 256);
        assert_eq!(plan.fused_offset(), 0);
        assert_eq!(plan.bias_add_offset(), plan.fused_bytes);
        assert_eq!(
            plan.scratch_offset(0, 0),
            plan.fused_bytes + plan.bias_add_bytes
        );
        assert_eq!(
            plan.scratch_offset(0, 1) - plan.scratch_offset(0, 0),
            plan.state_slot_bytes
        );
        // Cell plane starts after both hidden slots.
        assert_eq!(
            plan.scratch_offset(1, 0) - plan.scratch_offset(0, 0),
            2 * plan.state_slot_bytes
        );
        // Last slot ends exactly at the direction total.
        assert_eq!(
            plan.scratch_offset(1, 1) + plan.state_slot_bytes,
            plan.direction_bytes()
        );
    }

    #[test]
    fn test_summary() {
        let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
        let s = plan.summary();
        assert!(s.contains("81920"));
        assert!(s.contains("2 slot(s)"));
    }

    #[test]
    fn test_serialises_for_diagnostics() {
        let plan = WorkAreaPlan::for_direction(CellKind::Lstm, 3, 4, 16, 256);
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"fused_bytes\":49152"));
        assert!(json.contains("\"scratch_slots\":2"));
    }
}
