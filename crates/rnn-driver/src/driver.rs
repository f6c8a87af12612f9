// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The composite driver: the public entry points that turn one
//! recurrent-layer call into a schedule of primitive operations.
//!
//! A call proceeds through fixed stages:
//!
//! 1. Contract verification (the pre-check path) — every shape/type/
//!    format rule is enforced before the first hardware call.
//! 2. Parameter derivation and work-area planning.
//! 3. Work-area acquisition: a caller-supplied buffer is validated, or
//!    a page-aligned area is allocated and released on every exit path.
//! 4. One scheduler pass (unidirectional), or two passes over sliced
//!    per-direction views into disjoint work-area halves (bidirectional),
//!    stopping at the first failure.
//! 5. On success, the output tensors' ready flags are set.
//!
//! The driver is stateless between invocations: nothing persists across
//! calls, and concurrent calls are safe as long as they use disjoint
//! tensors and work areas.

use crate::params::{Direction, RnnParams};
use crate::scheduler::{run_direction, DirectionInputs, InternalDirection};
use crate::{verify, EngineConfig, RnnError, RnnOutcome};
use accel_call::{Accelerator, Capabilities};
use tensor_native::{CellKind, Tensor, TensorView};
use work_area::{validate_caller_buffer, WorkArea, WorkAreaPlan};

/// The composite recurrent engine.
///
/// Holds the accelerator backend and the engine configuration; all call
/// state lives on the stack of each invocation.
///
/// # Example
/// ```no_run
/// use rnn_driver::{Direction, EngineConfig, RnnEngine};
/// # fn run<A: accel_call::Accelerator>(accel: A) -> Result<(), rnn_driver::RnnError> {
/// # let (input, h0, c0, w, b, hw, hb): (tensor_native::Tensor, tensor_native::Tensor, tensor_native::Tensor, tensor_native::Tensor, tensor_native::Tensor, tensor_native::Tensor, tensor_native::Tensor) = todo!();
/// # let (mut hn, mut cf): (tensor_native::Tensor, tensor_native::Tensor) = todo!();
/// let engine = RnnEngine::new(accel, EngineConfig::default());
/// let outcome = engine.lstm(
///     &input, &h0, &c0, &w, &b, &hw, &hb,
///     Direction::Forward, None, &mut hn, &mut cf,
/// )?;
/// assert!(!outcome.range_violation);
/// # Ok(())
/// # }
/// ```
pub struct RnnEngine<A: Accelerator> {
    accel: A,
    config: EngineConfig,
    caps: Capabilities,
}

impl<A: Accelerator> RnnEngine<A> {
    /// Creates an engine over a backend.
    ///
    /// Capabilities come from the configuration override when present,
    /// otherwise from the backend's own snapshot.
    pub fn new(accel: A, config: EngineConfig) -> Self {
        let caps = config.capabilities.unwrap_or_else(|| accel.capabilities());
        tracing::info!("rnn engine created ({caps}, precheck {})", config.precheck);
        Self { accel, config, caps }
    }

    /// Returns the capability snapshot this engine runs against.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Returns the backend.
    pub fn accelerator(&self) -> &A {
        &self.accel
    }

    /// Runs a four-gate (LSTM) recurrent layer.
    ///
    /// `hn_output`'s outer dimension selects the output mode: equal to
    /// the input's timestep count returns every timestep's hidden state,
    /// 1 returns only the final one. The cell state output is always
    /// final-only. `work_area` may supply a caller-owned scratch buffer
    /// (page-aligned, at least the planned size); without one the driver
    /// allocates and releases its own.
    ///
    /// On failure the whole output tensors are undefined.
    #[allow(clippy::too_many_arguments)]
    pub fn lstm(
        &self,
        input: &Tensor,
        h0: &Tensor,
        c0: &Tensor,
        weights: &Tensor,
        biases: &Tensor,
        hidden_weights: &Tensor,
        hidden_biases: &Tensor,
        direction: Direction,
        work_area: Option<&mut [u8]>,
        hn_output: &mut Tensor,
        cf_output: &mut Tensor,
    ) -> Result<RnnOutcome, RnnError> {
        self.composite(
            CellKind::Lstm,
            input,
            h0,
            Some(c0),
            weights,
            biases,
            hidden_weights,
            hidden_biases,
            direction,
            work_area,
            hn_output,
            Some(cf_output),
        )
    }

    /// Runs a three-gate (GRU) recurrent layer.
    ///
    /// Identical to [`RnnEngine::lstm`] minus the cell-state tensors,
    /// which the three-gate cell does not have.
    #[allow(clippy::too_many_arguments)]
    pub fn gru(
        &self,
        input: &Tensor,
        h0: &Tensor,
        weights: &Tensor,
        biases: &Tensor,
        hidden_weights: &Tensor,
        hidden_biases: &Tensor,
        direction: Direction,
        work_area: Option<&mut [u8]>,
        hn_output: &mut Tensor,
    ) -> Result<RnnOutcome, RnnError> {
        self.composite(
            CellKind::Gru,
            input,
            h0,
            None,
            weights,
            biases,
            hidden_weights,
            hidden_biases,
            direction,
            work_area,
            hn_output,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn composite(
        &self,
        cell: CellKind,
        input: &Tensor,
        h0: &Tensor,
        c0: Option<&Tensor>,
        weights: &Tensor,
        biases: &Tensor,
        hidden_weights: &Tensor,
        hidden_biases: &Tensor,
        direction: Direction,
        work_area: Option<&mut [u8]>,
        hn_output: &mut Tensor,
        mut cf_output: Option<&mut Tensor>,
    ) -> Result<RnnOutcome, RnnError> {
        if self.config.precheck {
            self.check_descriptor_limits(
                cell,
                input,
                h0,
                c0,
                weights,
                biases,
                hidden_weights,
                hidden_biases,
                hn_output,
                cf_output.as_deref(),
            )?;
            verify::verify_composite_tensors(
                cell,
                direction,
                input,
                h0,
                c0,
                weights,
                biases,
                hidden_weights,
                hidden_biases,
                hn_output,
                cf_output.as_deref(),
            )?;
        }

        let params = RnnParams::derive(cell, direction, input, h0, weights);
        let plan = WorkAreaPlan::for_direction(
            cell,
            params.timesteps,
            params.batch,
            params.hidden,
            params.gate_width_total,
        );
        let total = plan.total_bytes(params.directions);
        tracing::debug!(
            "{} {} call: {} timestep(s), {} byte work area",
            cell.as_str(),
            direction.as_str(),
            params.timesteps,
            total,
        );

        // Acquire the work area. An internally allocated area is
        // released when `owned` drops, which covers every exit path.
        let mut owned;
        let work: &mut [u8] = match work_area {
            Some(buf) => {
                validate_caller_buffer(buf, total)?;
                &mut buf[..total]
            }
            None => {
                owned = WorkArea::allocate(total)?;
                owned.as_mut_slice()
            }
        };

        let hn_view = hn_output.view_mut();
        let cf_view = cf_output.as_mut().map(|t| t.view_mut());

        let range_violation = match direction {
            Direction::Forward | Direction::Backward => {
                let internal = if direction == Direction::Forward {
                    InternalDirection::UniFwd
                } else {
                    InternalDirection::UniBwd
                };
                let ins = DirectionInputs {
                    h0: h0.view(),
                    c0: c0.map(Tensor::view),
                    weights: weights.view(),
                    biases: biases.view(),
                    hidden_weights: hidden_weights.view(),
                    hidden_biases: hidden_biases.view(),
                };
                run_direction(
                    &self.accel,
                    self.config.precheck,
                    &params,
                    internal,
                    input.view(),
                    &ins,
                    hn_view,
                    cf_view,
                    &plan,
                    work,
                )?
            }
            Direction::Bidirectional => {
                let half = plan.direction_bytes();
                let mut range = false;
                for dir_idx in 0..2u32 {
                    let internal = if dir_idx == 0 {
                        InternalDirection::BidirFwd
                    } else {
                        InternalDirection::BidirBwd
                    };
                    // Per-direction non-owning slices of every stacked
                    // input; no data moves.
                    let ins = DirectionInputs {
                        h0: slice_direction(h0, dir_idx)?,
                        c0: match c0 {
                            Some(t) => Some(slice_direction(t, dir_idx)?),
                            None => None,
                        },
                        weights: slice_direction(weights, dir_idx)?,
                        biases: slice_direction(biases, dir_idx)?,
                        hidden_weights: slice_direction(hidden_weights, dir_idx)?,
                        hidden_biases: slice_direction(hidden_biases, dir_idx)?,
                    };
                    let work_half = &mut work[dir_idx as usize * half..][..half];
                    range |= run_direction(
                        &self.accel,
                        self.config.precheck,
                        &params,
                        internal,
                        input.view(),
                        &ins,
                        hn_view,
                        cf_view,
                        &plan,
                        work_half,
                    )?;
                }
                range
            }
        };

        hn_output.mark_ready();
        if let Some(cf) = cf_output {
            cf.mark_ready();
        }
        Ok(RnnOutcome { range_violation })
    }

    /// Checks every descriptor against the machine's dimension and
    /// tensor-size limits.
    #[allow(clippy::too_many_arguments)]
    fn check_descriptor_limits(
        &self,
        cell: CellKind,
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
        let mut tensors = vec![
            input,
            h0,
            weights,
            biases,
            hidden_weights,
            hidden_biases,
            hn_output,
        ];
        if cell.has_cell_state() {
            tensors.extend(c0);
            tensors.extend(cf_output);
        }
        for t in tensors {
            t.native()
                .shape
                .check_limits(self.caps.max_dim_index, self.caps.max_tensor_bytes)?;
        }
        Ok(())
    }
}

/// Returns a non-owning view of one direction's slice of a
/// direction-stacked tensor.
fn slice_direction(t: &Tensor, dir_idx: u32) -> Result<TensorView<'_>, RnnError> {
    let view = t.view();
    let slice_bytes = view.byte_size() / view.native().shape.dim4 as usize;
    Ok(view.slice_outer(dir_idx, slice_bytes)?)
}

impl<A: Accelerator> std::fmt::Debug for RnnEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnnEngine")
            .field("precheck", &self.config.precheck)
            .field("capabilities", &self.caps)
            .finish()
    }
}
