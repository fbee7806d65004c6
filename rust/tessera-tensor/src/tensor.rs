//! A tensor registered with the native engine.

use std::sync::Arc;

use tessera_bytes::TensorMemory;
use tessera_common::{Result, error::Error};

use crate::{
    engine::NativeEngine,
    handle::NativeHandle,
    shape::element_count,
    tensor_type::{TensorElement, TensorType},
};

pub(crate) type BoxedMemory = Box<dyn TensorMemory + Send + Sync + 'static>;

/// A tensor owned by the native engine, identified by its [`NativeHandle`].
///
/// For buffer-backed tensors the `Tensor` also owns the buffer the engine reads
/// from, so the memory outlives the native handle. String tensors keep no local
/// data: the engine holds its own copy of the values.
///
/// The handle is released when the tensor is closed or dropped.
pub struct Tensor {
    engine: Arc<dyn NativeEngine>,
    handle: NativeHandle,
    tensor_type: TensorType,
    dims: Vec<u64>,
    buffer: Option<BoxedMemory>,
    released: bool,
}

impl Tensor {
    pub(crate) fn new(
        engine: Arc<dyn NativeEngine>,
        handle: NativeHandle,
        tensor_type: TensorType,
        dims: Vec<u64>,
        buffer: Option<BoxedMemory>,
    ) -> Tensor {
        Tensor {
            engine,
            handle,
            tensor_type,
            dims,
            buffer,
            released: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    #[inline]
    pub fn tensor_type(&self) -> TensorType {
        self.tensor_type
    }

    #[inline]
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    pub fn num_elements(&self) -> usize {
        // The shape was validated when the tensor was built.
        element_count(&self.dims).unwrap_or(0)
    }

    /// The bytes shared with the engine, or `None` for string tensors.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.buffer.as_ref().map(|b| b.as_bytes())
    }

    /// Address of the buffer shared with the engine, or `None` for string tensors.
    pub fn data_address(&self) -> Option<usize> {
        self.buffer.as_ref().map(|b| b.address())
    }

    /// Views the tensor data as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidOperation` error if `T` does not match the tensor's element
    /// type or the tensor holds strings.
    pub fn typed_data<T>(&self) -> Result<&[T]>
    where
        T: TensorElement,
    {
        if T::TENSOR_TYPE != self.tensor_type {
            return Err(Error::invalid_operation(format!(
                "read {} tensor as {}",
                self.tensor_type,
                T::TENSOR_TYPE
            )));
        }
        let bytes = self
            .as_bytes()
            .ok_or_else(|| Error::invalid_operation("typed read of a string tensor"))?;
        bytemuck::try_cast_slice(bytes)
            .map_err(|e| Error::invalid_operation(format!("typed read of tensor data: {e}")))
    }

    /// Releases the native handle, reporting any engine failure.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        self.engine.release_tensor(self.handle)
    }
}

impl Drop for Tensor {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.engine.release_tensor(self.handle) {
            log::warn!("failed to release {}: {e}", self.handle);
        }
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("handle", &self.handle)
            .field("tensor_type", &self.tensor_type)
            .field("dims", &self.dims)
            .field("data_len", &self.as_bytes().map(<[u8]>::len))
            .finish_non_exhaustive()
    }
}
