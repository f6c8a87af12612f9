// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned tensors and non-owning buffer views.
//!
//! A [`Tensor`] pairs a logical description with a page-aligned native
//! buffer it owns. A [`TensorView`] is what actually travels into an
//! accelerator call: a native descriptor plus raw buffer parts, borrowed
//! from a `Tensor` or carved out of another view by slicing. Views never
//! free anything — slices of a caller's tensor and offsets into the work
//! area are all just views into memory someone else owns.

use crate::concat::{concatenated_width1, concatenated_width2, ConcatInfo};
use crate::{AlignedBuf, LayoutError, LogicalLayout, LogicalShape, NativeDesc};
use std::marker::PhantomData;
use std::ptr::NonNull;

impl NativeDesc {
    /// Derives the native descriptor for a logical shape, expanding the
    /// 2-D/3-D logical form to the four hardware dimensions.
    ///
    /// For the per-gate-concatenated layouts the innermost dimension is
    /// expanded via [`concatenated_width1`] and — for input-side weights
    /// fed by a bidirectional previous layer — the feature dimension via
    /// [`concatenated_width2`]. Those layouts require `concat` info;
    /// the plain layouts ignore it.
    pub fn from_logical(
        logical: &LogicalShape,
        concat: Option<&ConcatInfo>,
    ) -> Result<Self, LayoutError> {
        let dims = logical.dims();
        match logical.layout() {
            LogicalLayout::TimeMajor3d => Ok(NativeDesc::feature(dims[0], 1, dims[1], dims[2])),
            LogicalLayout::State3d => Ok(NativeDesc::feature(dims[0], 1, dims[1], dims[2])),
            LogicalLayout::WeightsConcat3d => {
                let info = concat.ok_or(LayoutError::MissingConcatInfo {
                    layout: logical.layout(),
                })?;
                Ok(NativeDesc::feature(
                    dims[0],
                    1,
                    concatenated_width2(dims[1], Some(info))?,
                    concatenated_width1(dims[2], Some(info)),
                ))
            }
            LogicalLayout::BiasesConcat2d => {
                let info = concat.ok_or(LayoutError::MissingConcatInfo {
                    layout: logical.layout(),
                })?;
                Ok(NativeDesc::feature(
                    dims[0],
                    1,
                    1,
                    concatenated_width1(dims[1], Some(info)),
                ))
            }
        }
    }
}

/// An owned tensor: logical shape, native descriptor, page-aligned
/// buffer, and a ready flag recording whether the buffer contents are in
/// native format.
///
/// Tensors passed into the composite driver are owned by the caller for
/// the whole call; everything the driver creates internally is a
/// [`TensorView`] alias and owns nothing.
#[derive(Debug)]
pub struct Tensor {
    logical: LogicalShape,
    native: NativeDesc,
    concat: Option<ConcatInfo>,
    data: AlignedBuf,
    ready: bool,
}

impl Tensor {
    /// Creates a zero-filled tensor for a plain (non-concatenated)
    /// logical layout.
    ///
    /// # Examples
    /// ```
    /// use tensor_native::{LogicalLayout, LogicalShape, Tensor};
    /// let input = Tensor::new(
    ///     LogicalShape::new(LogicalLayout::TimeMajor3d, vec![5, 2, 32]).unwrap(),
    /// ).unwrap();
    /// assert_eq!(input.native().shape.dim4, 5);
    /// ```
    pub fn new(logical: LogicalShape) -> Result<Self, LayoutError> {
        let native = NativeDesc::from_logical(&logical, None)?;
        Self::alloc(logical, native, None)
    }

    /// Creates a zero-filled gate-concatenated weight/bias tensor, with
    /// the padding and concatenation rules applied per `info`.
    pub fn concatenated(logical: LogicalShape, info: ConcatInfo) -> Result<Self, LayoutError> {
        let native = NativeDesc::from_logical(&logical, Some(&info))?;
        Self::alloc(logical, native, Some(info))
    }

    /// Creates a tensor with an explicitly supplied native descriptor.
    ///
    /// Normal construction derives the descriptor from the logical shape;
    /// this bypass exists for callers interoperating with descriptors
    /// produced elsewhere (and for exercising the contract verifier).
    pub fn from_native(logical: LogicalShape, native: NativeDesc) -> Result<Self, LayoutError> {
        Self::alloc(logical, native, None)
    }

    fn alloc(
        logical: LogicalShape,
        native: NativeDesc,
        concat: Option<ConcatInfo>,
    ) -> Result<Self, LayoutError> {
        let data = AlignedBuf::zeroed(native.byte_size())?;
        Ok(Self {
            logical,
            native,
            concat,
            data,
            ready: false,
        })
    }

    /// Returns the logical shape.
    pub fn logical(&self) -> &LogicalShape {
        &self.logical
    }

    /// Returns the native descriptor.
    pub fn native(&self) -> &NativeDesc {
        &self.native
    }

    /// Returns the concatenation info attached at construction, if any.
    pub fn concat(&self) -> Option<&ConcatInfo> {
        self.concat.as_ref()
    }

    /// Returns `true` if the buffer contents are valid native-format data.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Marks the buffer contents as valid native-format data.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Clears the ready flag so the buffer can be refilled and the
    /// tensor reused without reallocating.
    pub fn reset(&mut self) {
        self.ready = false;
    }

    /// Returns the raw byte buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Returns the raw byte buffer mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    /// Returns a read-only view over this tensor's buffer.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            native: self.native,
            ptr: self.data.as_ptr(),
            len: self.data.len(),
            _lt: PhantomData,
        }
    }

    /// Returns a view over this tensor's buffer for use as an
    /// accelerator call *output*.
    ///
    /// The exclusive borrow guarantees no other safe reference to the
    /// buffer exists while the hardware (or a software backend) writes
    /// through the view.
    pub fn view_mut(&mut self) -> TensorView<'_> {
        TensorView {
            native: self.native,
            ptr: self.data.as_ptr(),
            len: self.data.len(),
            _lt: PhantomData,
        }
    }
}

/// A non-owning alias of (part of) a tensor buffer, carrying the native
/// descriptor the accelerator should see.
///
/// Views are plain data — copying one never copies tensor bytes, and
/// dropping one never frees. The lifetime ties a view to whatever it was
/// carved from.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    native: NativeDesc,
    ptr: NonNull<u8>,
    len: usize,
    _lt: PhantomData<&'a ()>,
}

impl<'a> TensorView<'a> {
    /// Builds a view from raw buffer parts.
    ///
    /// # Safety
    /// `ptr` must be valid for reads (and writes, if the view is used as
    /// a call output) of `len` bytes for the lifetime `'a`, and the
    /// memory must not be mutated through any other alias while the view
    /// is in use.
    pub unsafe fn from_raw_parts(native: NativeDesc, ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            native,
            ptr,
            len,
            _lt: PhantomData,
        }
    }

    /// Returns the native descriptor.
    pub fn native(&self) -> &NativeDesc {
        &self.native
    }

    /// Returns the exact byte size the descriptor describes.
    pub fn byte_size(&self) -> usize {
        self.native.byte_size()
    }

    /// Returns the base pointer of the viewed buffer.
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Returns the viewed buffer length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a non-owning view of the `index`-th outer-dimension slice.
    ///
    /// The slice's buffer starts `index · slice_bytes` into the parent
    /// buffer and its native outer dimension is forced to 1. Used to
    /// split direction-stacked tensors into per-direction views without
    /// moving data.
    pub fn slice_outer(&self, index: u32, slice_bytes: usize) -> Result<TensorView<'a>, LayoutError> {
        let offset = index as usize * slice_bytes;
        if offset + slice_bytes > self.len {
            return Err(LayoutError::SliceOutOfBounds {
                index,
                slice_bytes,
                parent_bytes: self.len,
            });
        }
        let mut native = self.native;
        native.shape.dim4 = 1;
        // SAFETY: offset + slice_bytes is within the parent buffer,
        // checked above; validity and aliasing follow from the parent.
        let ptr = unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) };
        Ok(TensorView {
            native,
            ptr,
            len: slice_bytes,
            _lt: PhantomData,
        })
    }

    /// Returns the same buffer under a different native descriptor.
    ///
    /// Used where one scratch buffer is written under one shape and read
    /// back under another (the hidden-projection result doubles as the
    /// gate-activation input).
    pub fn with_desc(&self, native: NativeDesc) -> Result<TensorView<'a>, LayoutError> {
        if native.byte_size() > self.len {
            return Err(LayoutError::ViewTooSmall {
                required: native.byte_size(),
                available: self.len,
            });
        }
        Ok(TensorView {
            native,
            ptr: self.ptr,
            len: self.len,
            _lt: PhantomData,
        })
    }

    /// Returns a view of a sub-range of this buffer under the given
    /// descriptor, starting `offset` bytes in.
    pub fn rebased(
        &self,
        offset: usize,
        native: NativeDesc,
    ) -> Result<TensorView<'a>, LayoutError> {
        let required = native.byte_size();
        if offset + required > self.len {
            return Err(LayoutError::ViewTooSmall {
                required: offset + required,
                available: self.len,
            });
        }
        // SAFETY: offset + required is within the parent buffer, checked above.
        let ptr = unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) };
        Ok(TensorView {
            native,
            ptr,
            len: required,
            _lt: PhantomData,
        })
    }
}
