//! The boundary to the native tensor engine.
//!
//! Everything behind [`NativeEngine`] (tensor representation, device placement,
//! execution) belongs to the engine. This layer only hands it buffers, shapes,
//! type tags and handles.

use tessera_common::Result;

use crate::{
    handle::{AllocatorHandle, NativeHandle},
    tensor_type::TensorType,
};

/// A request to register a buffer-backed tensor with the engine.
///
/// `data` is the caller's buffer itself, not a copy. The engine may keep the
/// address until the returned handle is released; the owning [`crate::Tensor`]
/// keeps the buffer alive for that long.
#[derive(Debug, Clone, Copy)]
pub struct TensorRequest<'a> {
    pub data: &'a [u8],
    pub dims: &'a [u64],
    pub tensor_type: TensorType,
    pub allocator: AllocatorHandle,
}

impl TensorRequest<'_> {
    /// The element type tag as passed across the boundary.
    pub fn type_tag(&self) -> i32 {
        self.tensor_type.value()
    }

    /// Address of the first data byte.
    pub fn address(&self) -> usize {
        self.data.as_ptr() as usize
    }
}

/// A request to create a string tensor; the values are copied by the engine.
#[derive(Debug, Clone, Copy)]
pub struct StringTensorRequest<'a> {
    pub values: &'a [&'a str],
    pub dims: &'a [u64],
    pub allocator: AllocatorHandle,
}

/// An external tensor engine reached through opaque handles.
///
/// Implementations report their own failures as `NativeBridgeFailure` errors
/// (see [`tessera_common::error::Error::native`]); callers propagate them unchanged.
pub trait NativeEngine: Send + Sync {
    /// Creates a generic allocator on the engine side.
    fn create_allocator(&self) -> Result<AllocatorHandle>;

    /// Releases an allocator handle.
    fn release_allocator(&self, allocator: AllocatorHandle) -> Result<()>;

    /// Registers a tensor over the caller's buffer.
    fn allocate_tensor(&self, request: &TensorRequest<'_>) -> Result<NativeHandle>;

    /// Creates a string tensor from a copy of the given values.
    fn create_string_tensor(&self, request: &StringTensorRequest<'_>) -> Result<NativeHandle>;

    /// Releases a tensor handle.
    fn release_tensor(&self, handle: NativeHandle) -> Result<()>;
}
