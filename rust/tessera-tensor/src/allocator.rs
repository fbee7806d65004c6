//! The caller-facing tensor factory.

use std::sync::Arc;

use tessera_bytes::{AlignedBuffer, TensorMemory, allocate_aligned};
use tessera_common::{
    Result,
    error::{Error, Precondition},
    verify_arg,
};

use crate::{
    config::AllocatorConfig,
    engine::{NativeEngine, StringTensorRequest, TensorRequest},
    handle::AllocatorHandle,
    shape::{byte_size, element_count},
    tensor::Tensor,
    tensor_type::{BUFFER_TENSOR_TYPES, TensorElement, TensorType},
};

/// Builds tensors and registers them with a native engine.
///
/// An allocator wraps an engine-side allocator handle, either a generic one
/// ([`TensorAllocator::generic`]) or one obtained elsewhere, e.g. from a loaded
/// model ([`TensorAllocator::from_handle`]). The handle is released when the
/// allocator is closed or dropped. Tensors created by the allocator hold their
/// own reference to the engine and may outlive it.
///
/// Every check on a caller's input runs before the engine is called, so a
/// rejected request never leaves anything behind on the native side.
pub struct TensorAllocator {
    engine: Arc<dyn NativeEngine>,
    handle: AllocatorHandle,
    config: AllocatorConfig,
    released: bool,
}

impl TensorAllocator {
    /// Creates an allocator backed by a new generic engine-side allocator.
    pub fn generic(engine: Arc<dyn NativeEngine>) -> Result<TensorAllocator> {
        Self::with_config(engine, AllocatorConfig::default())
    }

    /// Creates an allocator backed by a new generic engine-side allocator,
    /// using the given configuration.
    pub fn with_config(
        engine: Arc<dyn NativeEngine>,
        config: AllocatorConfig,
    ) -> Result<TensorAllocator> {
        config.validate()?;
        let handle = engine.create_allocator()?;
        log::debug!("created generic {handle} (alignment {})", config.alignment);
        Ok(TensorAllocator {
            engine,
            handle,
            config,
            released: false,
        })
    }

    /// Wraps an allocator handle issued by the engine through some other path.
    ///
    /// The new `TensorAllocator` takes ownership of the handle.
    pub fn from_handle(
        engine: Arc<dyn NativeEngine>,
        handle: AllocatorHandle,
        config: AllocatorConfig,
    ) -> Result<TensorAllocator> {
        config.validate()?;
        Ok(TensorAllocator {
            engine,
            handle,
            config,
            released: false,
        })
    }

    #[inline]
    pub fn handle(&self) -> AllocatorHandle {
        self.handle
    }

    #[inline]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Element types accepted by [`TensorAllocator::tensor_from_memory`].
    pub fn supported_tensor_types() -> &'static [TensorType] {
        BUFFER_TENSOR_TYPES
    }

    /// Allocates a writable, native-order buffer of `capacity` bytes aligned to `alignment`.
    ///
    /// See [`tessera_bytes::allocate_aligned`].
    pub fn allocate_aligned(capacity: usize, alignment: usize) -> Result<AlignedBuffer> {
        allocate_aligned(capacity, alignment)
    }

    /// Allocates a zeroed buffer sized for a tensor of `tensor_type` with shape `dims`,
    /// at the configured alignment.
    pub fn allocate_for(&self, dims: &[u64], tensor_type: TensorType) -> Result<AlignedBuffer> {
        let size = byte_size(dims, tensor_type)?;
        self.config.check_size(size)?;
        allocate_aligned(size, self.config.alignment)
    }

    /// Creates a tensor over `buffer` without copying it.
    ///
    /// The buffer must be direct memory in native byte order, writable, and
    /// exactly `product(dims) * bytes_per_element` bytes long, and `tensor_type`
    /// must be one of [`TensorAllocator::supported_tensor_types`]. The checks run in
    /// that order: type, direct, byte order, read-only, size.
    ///
    /// # Errors
    ///
    /// - `PreconditionViolation` naming the failed check;
    /// - `InvalidArgument` if the buffer size does not match the shape;
    /// - `NativeBridgeFailure` if the engine rejects the tensor.
    pub fn tensor_from_memory<M>(
        &self,
        buffer: M,
        dims: &[u64],
        tensor_type: TensorType,
    ) -> Result<Tensor>
    where
        M: TensorMemory + Send + Sync + 'static,
    {
        check_buffer(&buffer, tensor_type)?;
        let expected = byte_size(dims, tensor_type)?;
        let actual = buffer.as_bytes().len();
        if actual != expected {
            return Err(Error::invalid_arg(
                "buffer",
                format!("{tensor_type} with dims {dims:?} needs {expected} bytes, got {actual}"),
            ));
        }
        self.config.check_size(actual)?;
        self.register(Box::new(buffer), dims, tensor_type)
    }

    /// Creates a tensor holding a copy of `data` with shape `dims`.
    ///
    /// The data is copied into a freshly allocated aligned buffer in native byte
    /// order. `dims` must describe exactly `data.len()` elements.
    pub fn copy_from<T>(&self, data: &[T], dims: &[u64]) -> Result<Tensor>
    where
        T: TensorElement,
    {
        let count = element_count(dims)?;
        verify_arg!(dims, count == data.len());
        let tensor_type = T::TENSOR_TYPE;
        let mut buffer = self.allocate_for(dims, tensor_type)?;
        buffer.write_typed(data)?;
        self.register(Box::new(buffer), dims, tensor_type)
    }

    /// Creates an `INT32_TENSOR` from a copy of `data`.
    pub fn copy_from_i32(&self, data: &[i32], dims: &[u64]) -> Result<Tensor> {
        self.copy_from(data, dims)
    }

    /// Creates an `INT64_TENSOR` from a copy of `data`.
    pub fn copy_from_i64(&self, data: &[i64], dims: &[u64]) -> Result<Tensor> {
        self.copy_from(data, dims)
    }

    /// Creates a `FLOAT_TENSOR` from a copy of `data`.
    pub fn copy_from_f32(&self, data: &[f32], dims: &[u64]) -> Result<Tensor> {
        self.copy_from(data, dims)
    }

    /// Creates a `DOUBLE_TENSOR` from a copy of `data`.
    pub fn copy_from_f64(&self, data: &[f64], dims: &[u64]) -> Result<Tensor> {
        self.copy_from(data, dims)
    }

    /// Creates a `STRING_TENSOR` from `values` with shape `dims`.
    ///
    /// Strings bypass the byte-buffer path: the engine receives the values and
    /// keeps its own copy.
    pub fn copy_from_strings<S>(&self, values: &[S], dims: &[u64]) -> Result<Tensor>
    where
        S: AsRef<str>,
    {
        let count = element_count(dims)?;
        verify_arg!(dims, count == values.len());
        let values = values.iter().map(|v| v.as_ref()).collect::<Vec<&str>>();
        let request = StringTensorRequest {
            values: &values,
            dims,
            allocator: self.handle,
        };
        let handle = self.engine.create_string_tensor(&request)?;
        log::debug!("created {} {handle} dims={dims:?}", TensorType::String);
        Ok(Tensor::new(
            self.engine.clone(),
            handle,
            TensorType::String,
            dims.to_vec(),
            None,
        ))
    }

    /// Releases the engine-side allocator, reporting any engine failure.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        self.engine.release_allocator(self.handle)
    }

    fn register(
        &self,
        buffer: crate::tensor::BoxedMemory,
        dims: &[u64],
        tensor_type: TensorType,
    ) -> Result<Tensor> {
        let request = TensorRequest {
            data: buffer.as_bytes(),
            dims,
            tensor_type,
            allocator: self.handle,
        };
        let handle = self.engine.allocate_tensor(&request)?;
        log::debug!(
            "created {tensor_type} {handle} dims={dims:?} bytes={} address={:#x}",
            request.data.len(),
            request.address()
        );
        Ok(Tensor::new(
            self.engine.clone(),
            handle,
            tensor_type,
            dims.to_vec(),
            Some(buffer),
        ))
    }
}

impl Drop for TensorAllocator {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.engine.release_allocator(self.handle) {
            log::warn!("failed to release {}: {e}", self.handle);
        }
    }
}

impl std::fmt::Debug for TensorAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorAllocator")
            .field("handle", &self.handle)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Runs the caller-side buffer checks, in order: type, direct, byte order, read-only.
pub fn check_buffer<M>(buffer: &M, tensor_type: TensorType) -> Result<()>
where
    M: TensorMemory + ?Sized,
{
    if !tensor_type.is_buffer_supported() {
        return Err(Error::precondition(
            Precondition::UnsupportedType,
            format!("unsupported tensor type: {tensor_type}"),
        ));
    }
    if !buffer.is_direct() {
        return Err(Error::precondition(
            Precondition::NotDirect,
            "the input buffer is not direct",
        ));
    }
    if !buffer.order().is_native() {
        return Err(Error::precondition(
            Precondition::NonNativeOrder,
            format!("the input buffer is in {} order", buffer.order()),
        ));
    }
    if buffer.is_read_only() {
        return Err(Error::precondition(
            Precondition::ReadOnly,
            "the input buffer is read-only",
        ));
    }
    Ok(())
}
