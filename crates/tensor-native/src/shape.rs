// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical and native (tiled) tensor shape descriptors.
//!
//! A *logical* shape is what the caller thinks in: ordered dimension
//! sizes plus a layout tag giving the dimensions meaning. A *native*
//! shape is the four-dimension form the co-processor actually addresses:
//! memory is organised into fixed-size pages subdivided into fixed-width
//! sticks of the innermost dimension, so the byte size of a native
//! tensor depends only on its four dimensions — never on the data.

use crate::{DataType, Format, LayoutError};
use std::fmt;

/// Number of 2-byte elements per hardware stick. The innermost dimension
/// is tiled (and gate regions padded) to this granularity.
pub const CELLS_PER_STICK: u32 = 64;

/// Number of sticks per hardware page.
pub const STICKS_PER_PAGE: u32 = 32;

/// Size of one hardware page in bytes.
pub const PAGE_BYTES: usize = 4096;

/// Ceiling division: how many `unit`-sized groups `n` occupies.
#[inline]
pub(crate) fn ceil_div(n: u32, unit: u32) -> u32 {
    n.div_ceil(unit)
}

/// Describes the semantics of a logical shape's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LogicalLayout {
    /// `(timesteps, batch, features)` — time-major activations. Also used
    /// for output hidden/cell state where the outer dimension is the
    /// timestep count or 1.
    TimeMajor3d,
    /// `(directions, batch, hidden)` — per-direction recurrent state.
    State3d,
    /// `(directions, features, per-gate width)` — weights that are
    /// horizontally concatenated per gate with padding between gates.
    WeightsConcat3d,
    /// `(directions, per-gate width)` — biases that are horizontally
    /// concatenated per gate with padding between gates.
    BiasesConcat2d,
}

impl LogicalLayout {
    /// Returns the dimension count this layout expects.
    pub fn rank(self) -> usize {
        match self {
            LogicalLayout::TimeMajor3d => 3,
            LogicalLayout::State3d => 3,
            LogicalLayout::WeightsConcat3d => 3,
            LogicalLayout::BiasesConcat2d => 2,
        }
    }

    /// Returns `true` for the per-gate-concatenated layouts, which
    /// require concatenation info to derive a native shape.
    pub fn is_concatenated(self) -> bool {
        matches!(
            self,
            LogicalLayout::WeightsConcat3d | LogicalLayout::BiasesConcat2d
        )
    }
}

/// A logical tensor shape: ordered dimension sizes plus a layout tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LogicalShape {
    dims: Vec<u32>,
    layout: LogicalLayout,
}

impl LogicalShape {
    /// Creates a logical shape, checking the dimension count against the
    /// layout's expected rank.
    pub fn new(layout: LogicalLayout, dims: Vec<u32>) -> Result<Self, LayoutError> {
        if dims.len() != layout.rank() {
            return Err(LayoutError::RankMismatch {
                layout,
                expected: layout.rank(),
                found: dims.len(),
            });
        }
        Ok(Self { dims, layout })
    }

    /// Returns the layout tag.
    pub fn layout(&self) -> LogicalLayout {
        self.layout
    }

    /// Returns the dimensions, outermost first.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }
}

impl fmt::Display for LogicalShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// The four hardware dimensions of a native tensor.
///
/// `dim4` is the outermost dimension and `dim1` the innermost (the one
/// laid out along sticks), matching the co-processor's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NativeShape {
    pub dim4: u32,
    pub dim3: u32,
    pub dim2: u32,
    pub dim1: u32,
}

impl NativeShape {
    /// Creates a native shape from outermost to innermost dimension.
    pub fn new(dim4: u32, dim3: u32, dim2: u32, dim1: u32) -> Self {
        Self { dim4, dim3, dim2, dim1 }
    }

    /// Returns dimension `n` (4 = outermost … 1 = innermost).
    ///
    /// # Panics
    /// Panics if `n` is not in `1..=4`.
    pub fn dim(&self, n: u8) -> u32 {
        match n {
            4 => self.dim4,
            3 => self.dim3,
            2 => self.dim2,
            1 => self.dim1,
            _ => panic!("native shapes have dimensions 1..=4, asked for {n}"),
        }
    }

    /// Computes the exact buffer size in bytes for this shape in the
    /// tiled native layout.
    ///
    /// The innermost dimension is split into sticks of
    /// [`CELLS_PER_STICK`] 2-byte elements and `dim2` is split into
    /// pages of [`STICKS_PER_PAGE`] sticks, so:
    ///
    /// ```text
    /// dim4 · dim3 · ceil(dim2, 32) · ceil(dim1, 64) · 4096
    /// ```
    ///
    /// This formula is the same for feature and kernel tiling and is the
    /// basis of every work-area size computation in the runtime.
    ///
    /// # Examples
    /// ```
    /// use tensor_native::NativeShape;
    /// // (3, 1, 4, 256): 3 · 1 · ceil(4/32) · ceil(256/64) · 4096
    /// assert_eq!(NativeShape::new(3, 1, 4, 256).byte_size(), 49152);
    /// ```
    pub fn byte_size(&self) -> usize {
        self.dim4 as usize
            * self.dim3 as usize
            * ceil_div(self.dim2, STICKS_PER_PAGE) as usize
            * ceil_div(self.dim1, CELLS_PER_STICK) as usize
            * PAGE_BYTES
    }

    /// Checks every dimension is nonzero and within the accelerator's
    /// maximum dimension index size, and the total byte size is within
    /// its maximum tensor size.
    pub fn check_limits(&self, max_dim_index: u32, max_tensor_bytes: u64) -> Result<(), LayoutError> {
        for n in (1..=4).rev() {
            let found = self.dim(n);
            if found == 0 {
                return Err(LayoutError::ZeroDimension { dim: n });
            }
            if found > max_dim_index {
                return Err(LayoutError::ExceedsMaxDim {
                    dim: n,
                    found,
                    max: max_dim_index,
                });
            }
        }
        let size = self.byte_size() as u64;
        if size > max_tensor_bytes {
            return Err(LayoutError::ExceedsMaxSize {
                found: size,
                max: max_tensor_bytes,
            });
        }
        Ok(())
    }
}

impl fmt::Display for NativeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.dim4, self.dim3, self.dim2, self.dim1
        )
    }
}

/// A full native tensor descriptor: shape, tiling format, element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NativeDesc {
    pub shape: NativeShape,
    pub dtype: DataType,
    pub format: Format,
}

impl NativeDesc {
    /// Creates a feature-format descriptor in the accelerator's native
    /// 16-bit type — the form every recurrent-network tensor takes.
    pub fn feature(dim4: u32, dim3: u32, dim2: u32, dim1: u32) -> Self {
        Self {
            shape: NativeShape::new(dim4, dim3, dim2, dim1),
            dtype: DataType::NpuFloat16,
            format: Format::Feature4d,
        }
    }

    /// Exact buffer size in bytes (see [`NativeShape::byte_size`]).
    pub fn byte_size(&self) -> usize {
        self.shape.byte_size()
    }
}
