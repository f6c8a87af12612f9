// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

/// Enumerates the numeric element types a tensor buffer can hold.
///
/// All tensors fed into the co-processor's recurrent operations use
/// [`DataType::NpuFloat16`], the accelerator's native 16-bit floating
/// format. The conventional formats are carried for the pre-conversion
/// side of the layout codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    /// The accelerator's native 16-bit floating point format.
    NpuFloat16,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 32-bit IEEE 754 floating point.
    F32,
}

impl DataType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::NpuFloat16 => 2,
            DataType::F16 => 2,
            DataType::F32 => 4,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::NpuFloat16 => "npufloat16",
            DataType::F16 => "f16",
            DataType::F32 => "f32",
        }
    }
}

/// The accelerator's memory arrangement for a native tensor buffer.
///
/// Feature tensors and kernel tensors are tiled differently in hardware,
/// but share the same total-size formula (see [`crate::NativeShape`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Format {
    /// 4-D feature-map tiling. All recurrent-network tensors use this.
    Feature4d,
    /// 4-D convolution-kernel tiling.
    Kernel4d,
}

impl Format {
    /// Returns a human-readable label for this format.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Feature4d => "4d-feature",
            Format::Kernel4d => "4d-kernel",
        }
    }
}
