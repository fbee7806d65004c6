//! An in-process [`NativeEngine`] that keeps a registry of allocators and tensors.
//!
//! `LocalEngine` performs the bookkeeping a native engine does at the boundary
//! (handle issue and release, shape/size agreement) without owning any tensor
//! memory. It backs the command-line tool and the integration tests.

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use tessera_common::{Result, error::Error};

use crate::{
    engine::{NativeEngine, StringTensorRequest, TensorRequest},
    handle::{AllocatorHandle, NativeHandle},
    handle_table::HandleTable,
    shape::{byte_size, element_count},
    tensor_type::TensorType,
};

/// Failures reported by [`LocalEngine`], surfaced as `NativeBridgeFailure` errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocalEngineError {
    #[error("unknown or released {0}")]
    InvalidAllocator(AllocatorHandle),

    #[error("unknown or released {0}")]
    InvalidTensor(NativeHandle),

    #[error("{tensor_type} with dims {dims:?} needs {expected} bytes, buffer has {actual}")]
    SizeMismatch {
        tensor_type: TensorType,
        dims: Vec<u64>,
        expected: usize,
        actual: usize,
    },

    #[error("{0} cannot be backed by a byte buffer")]
    NotFixedWidth(TensorType),

    #[error("dims {dims:?} describe {expected} values, got {actual}")]
    CountMismatch {
        dims: Vec<u64>,
        expected: usize,
        actual: usize,
    },

    #[error("invalid shape {0:?}")]
    InvalidShape(Vec<u64>),

    #[error("no free handles left")]
    Exhausted,

    #[error("engine state lock poisoned")]
    Poisoned,
}

/// What the engine knows about a registered buffer-backed tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorRecord {
    pub tensor_type: TensorType,
    pub dims: Vec<u64>,
    pub address: usize,
    pub byte_len: usize,
    pub allocator: AllocatorHandle,
}

#[derive(Debug, Clone)]
enum Registered {
    Buffer(TensorRecord),
    Strings {
        dims: Vec<u64>,
        values: Vec<String>,
        allocator: AllocatorHandle,
    },
}

#[derive(Debug)]
struct EngineState {
    allocators: HandleTable<()>,
    tensors: HandleTable<Registered>,
}

/// An in-process engine with a generational handle registry.
#[derive(Debug)]
pub struct LocalEngine {
    state: Mutex<EngineState>,
}

impl LocalEngine {
    pub fn new() -> LocalEngine {
        LocalEngine {
            state: Mutex::new(EngineState {
                allocators: HandleTable::new(),
                tensors: HandleTable::new(),
            }),
        }
    }

    /// Number of allocators that have not been released.
    pub fn live_allocators(&self) -> usize {
        self.inspect().allocators.len()
    }

    /// Number of tensors that have not been released.
    pub fn live_tensors(&self) -> usize {
        self.inspect().tensors.len()
    }

    /// Returns the record of a live buffer-backed tensor.
    pub fn tensor_record(&self, handle: NativeHandle) -> Option<TensorRecord> {
        let state = self.inspect();
        match state.tensors.get(handle.as_raw())? {
            Registered::Buffer(record) => Some(record.clone()),
            Registered::Strings { .. } => None,
        }
    }

    /// Returns the engine's copy of a live string tensor's values.
    pub fn string_values(&self, handle: NativeHandle) -> Option<Vec<String>> {
        let state = self.inspect();
        match state.tensors.get(handle.as_raw())? {
            Registered::Strings { values, .. } => Some(values.clone()),
            Registered::Buffer(_) => None,
        }
    }

    /// Returns the shape of a live tensor of either kind.
    pub fn tensor_dims(&self, handle: NativeHandle) -> Option<Vec<u64>> {
        let state = self.inspect();
        match state.tensors.get(handle.as_raw())? {
            Registered::Buffer(record) => Some(record.dims.clone()),
            Registered::Strings { dims, .. } => Some(dims.clone()),
        }
    }

    /// Handles of live tensors created through `allocator`.
    pub fn tensors_of(&self, allocator: AllocatorHandle) -> Vec<NativeHandle> {
        self.inspect()
            .tensors
            .iter()
            .filter(|(_, entry)| match entry {
                Registered::Buffer(record) => record.allocator == allocator,
                Registered::Strings { allocator: a, .. } => *a == allocator,
            })
            .map(|(raw, _)| NativeHandle::from_raw(raw))
            .collect()
    }

    /// Locks the state for an engine call; a poisoned lock fails the call.
    fn lock(&self, context: &str) -> Result<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| Error::native(context, LocalEngineError::Poisoned))
    }

    /// Locks the state for inspection, recovering it from a poisoned lock.
    fn inspect(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    fn check_allocator(
        &self,
        allocator: AllocatorHandle,
    ) -> std::result::Result<(), LocalEngineError> {
        if self.allocators.contains(allocator.as_raw()) {
            Ok(())
        } else {
            Err(LocalEngineError::InvalidAllocator(allocator))
        }
    }
}

impl NativeEngine for LocalEngine {
    fn create_allocator(&self) -> Result<AllocatorHandle> {
        let mut state = self.lock("create_allocator")?;
        let raw = state
            .allocators
            .insert(())
            .ok_or_else(|| Error::native("create_allocator", LocalEngineError::Exhausted))?;
        Ok(AllocatorHandle::from_raw(raw))
    }

    fn release_allocator(&self, allocator: AllocatorHandle) -> Result<()> {
        let mut state = self.lock("release_allocator")?;
        state
            .allocators
            .remove(allocator.as_raw())
            .ok_or_else(|| {
                Error::native(
                    "release_allocator",
                    LocalEngineError::InvalidAllocator(allocator),
                )
            })
    }

    fn allocate_tensor(&self, request: &TensorRequest<'_>) -> Result<NativeHandle> {
        let mut state = self.lock("allocate_tensor")?;
        state
            .check_allocator(request.allocator)
            .map_err(|e| Error::native("allocate_tensor", e))?;

        let tensor_type = request.tensor_type;
        if tensor_type.bytes_per_element().is_none() {
            return Err(Error::native(
                "allocate_tensor",
                LocalEngineError::NotFixedWidth(tensor_type),
            ));
        }
        let expected = byte_size(request.dims, tensor_type).map_err(|_| {
            Error::native(
                "allocate_tensor",
                LocalEngineError::InvalidShape(request.dims.to_vec()),
            )
        })?;
        if expected != request.data.len() {
            return Err(Error::native(
                "allocate_tensor",
                LocalEngineError::SizeMismatch {
                    tensor_type,
                    dims: request.dims.to_vec(),
                    expected,
                    actual: request.data.len(),
                },
            ));
        }

        let record = TensorRecord {
            tensor_type,
            dims: request.dims.to_vec(),
            address: request.address(),
            byte_len: request.data.len(),
            allocator: request.allocator,
        };
        let raw = state
            .tensors
            .insert(Registered::Buffer(record))
            .ok_or_else(|| Error::native("allocate_tensor", LocalEngineError::Exhausted))?;
        let handle = NativeHandle::from_raw(raw);
        log::trace!("registered {tensor_type} {handle}");
        Ok(handle)
    }

    fn create_string_tensor(&self, request: &StringTensorRequest<'_>) -> Result<NativeHandle> {
        let mut state = self.lock("create_string_tensor")?;
        state
            .check_allocator(request.allocator)
            .map_err(|e| Error::native("create_string_tensor", e))?;

        let expected = element_count(request.dims).map_err(|_| {
            Error::native(
                "create_string_tensor",
                LocalEngineError::InvalidShape(request.dims.to_vec()),
            )
        })?;
        if expected != request.values.len() {
            return Err(Error::native(
                "create_string_tensor",
                LocalEngineError::CountMismatch {
                    dims: request.dims.to_vec(),
                    expected,
                    actual: request.values.len(),
                },
            ));
        }

        let entry = Registered::Strings {
            dims: request.dims.to_vec(),
            values: request.values.iter().map(|s| s.to_string()).collect(),
            allocator: request.allocator,
        };
        let raw = state
            .tensors
            .insert(entry)
            .ok_or_else(|| Error::native("create_string_tensor", LocalEngineError::Exhausted))?;
        let handle = NativeHandle::from_raw(raw);
        log::trace!("registered {} {handle}", TensorType::String);
        Ok(handle)
    }

    fn release_tensor(&self, handle: NativeHandle) -> Result<()> {
        let mut state = self.lock("release_tensor")?;
        state
            .tensors
            .remove(handle.as_raw())
            .map(|_| ())
            .ok_or_else(|| {
                Error::native("release_tensor", LocalEngineError::InvalidTensor(handle))
            })
    }
}
