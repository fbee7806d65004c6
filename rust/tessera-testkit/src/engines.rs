//! Engine wrappers for exercising the allocator against a controllable backend.

use std::sync::{Arc, Mutex, MutexGuard};

use tessera_common::{Result, error::Error};
use tessera_tensor::{
    AllocatorHandle, LocalEngine, NativeEngine, NativeHandle, StringTensorRequest, TensorRequest,
    TensorType,
};

/// An engine entry point, used to select which calls a [`FailingEngine`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    CreateAllocator,
    ReleaseAllocator,
    AllocateTensor,
    CreateStringTensor,
    ReleaseTensor,
}

impl EngineOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineOp::CreateAllocator => "create_allocator",
            EngineOp::ReleaseAllocator => "release_allocator",
            EngineOp::AllocateTensor => "allocate_tensor",
            EngineOp::CreateStringTensor => "create_string_tensor",
            EngineOp::ReleaseTensor => "release_tensor",
        }
    }
}

/// A single call observed by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    CreateAllocator,
    ReleaseAllocator(AllocatorHandle),
    AllocateTensor {
        tensor_type: TensorType,
        type_tag: i32,
        dims: Vec<u64>,
        address: usize,
        byte_len: usize,
        allocator: AllocatorHandle,
    },
    CreateStringTensor {
        dims: Vec<u64>,
        values: Vec<String>,
        allocator: AllocatorHandle,
    },
    ReleaseTensor(NativeHandle),
}

impl EngineCall {
    pub fn op(&self) -> EngineOp {
        match self {
            EngineCall::CreateAllocator => EngineOp::CreateAllocator,
            EngineCall::ReleaseAllocator(_) => EngineOp::ReleaseAllocator,
            EngineCall::AllocateTensor { .. } => EngineOp::AllocateTensor,
            EngineCall::CreateStringTensor { .. } => EngineOp::CreateStringTensor,
            EngineCall::ReleaseTensor(_) => EngineOp::ReleaseTensor,
        }
    }
}

/// Forwards every call to an inner engine and keeps a log of what it was asked.
///
/// Calls are recorded before they are forwarded, so rejected calls show up too.
pub struct RecordingEngine {
    inner: Arc<dyn NativeEngine>,
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    /// Records calls in front of a fresh [`LocalEngine`].
    pub fn new() -> RecordingEngine {
        RecordingEngine::wrap(Arc::new(LocalEngine::new()))
    }

    pub fn wrap(inner: Arc<dyn NativeEngine>) -> RecordingEngine {
        RecordingEngine {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A snapshot of the calls seen so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    /// The most recent `allocate_tensor` call, if any.
    pub fn last_tensor_call(&self) -> Option<EngineCall> {
        self.lock()
            .iter()
            .rev()
            .find(|c| c.op() == EngineOp::AllocateTensor)
            .cloned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, call: EngineCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EngineCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        RecordingEngine::new()
    }
}

impl NativeEngine for RecordingEngine {
    fn create_allocator(&self) -> Result<AllocatorHandle> {
        self.record(EngineCall::CreateAllocator);
        self.inner.create_allocator()
    }

    fn release_allocator(&self, allocator: AllocatorHandle) -> Result<()> {
        self.record(EngineCall::ReleaseAllocator(allocator));
        self.inner.release_allocator(allocator)
    }

    fn allocate_tensor(&self, request: &TensorRequest<'_>) -> Result<NativeHandle> {
        self.record(EngineCall::AllocateTensor {
            tensor_type: request.tensor_type,
            type_tag: request.type_tag(),
            dims: request.dims.to_vec(),
            address: request.address(),
            byte_len: request.data.len(),
            allocator: request.allocator,
        });
        self.inner.allocate_tensor(request)
    }

    fn create_string_tensor(&self, request: &StringTensorRequest<'_>) -> Result<NativeHandle> {
        self.record(EngineCall::CreateStringTensor {
            dims: request.dims.to_vec(),
            values: request.values.iter().map(|v| v.to_string()).collect(),
            allocator: request.allocator,
        });
        self.inner.create_string_tensor(request)
    }

    fn release_tensor(&self, handle: NativeHandle) -> Result<()> {
        self.record(EngineCall::ReleaseTensor(handle));
        self.inner.release_tensor(handle)
    }
}

/// The error a [`FailingEngine`] reports as the source of its native failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("injected failure in {op}: {message}")]
pub struct InjectedFailure {
    pub op: &'static str,
    pub message: String,
}

/// Forwards calls to an inner engine, except for the selected entry points,
/// which fail with a `NativeBridgeFailure` carrying an [`InjectedFailure`].
pub struct FailingEngine {
    inner: Arc<dyn NativeEngine>,
    fail_on: Mutex<Vec<EngineOp>>,
    message: String,
}

impl FailingEngine {
    pub fn new(fail_on: &[EngineOp]) -> FailingEngine {
        FailingEngine::wrap(Arc::new(LocalEngine::new()), fail_on)
    }

    pub fn wrap(inner: Arc<dyn NativeEngine>, fail_on: &[EngineOp]) -> FailingEngine {
        FailingEngine {
            inner,
            fail_on: Mutex::new(fail_on.to_vec()),
            message: "engine out of memory".to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> FailingEngine {
        self.message = message.into();
        self
    }

    /// Stops failing calls to `op`.
    pub fn heal(&self, op: EngineOp) {
        self.fail_on
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|o| *o != op);
    }

    fn check(&self, op: EngineOp) -> Result<()> {
        let failing = self
            .fail_on
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&op);
        if failing {
            return Err(Error::native(
                op.as_str(),
                InjectedFailure {
                    op: op.as_str(),
                    message: self.message.clone(),
                },
            ));
        }
        Ok(())
    }
}

impl NativeEngine for FailingEngine {
    fn create_allocator(&self) -> Result<AllocatorHandle> {
        self.check(EngineOp::CreateAllocator)?;
        self.inner.create_allocator()
    }

    fn release_allocator(&self, allocator: AllocatorHandle) -> Result<()> {
        self.check(EngineOp::ReleaseAllocator)?;
        self.inner.release_allocator(allocator)
    }

    fn allocate_tensor(&self, request: &TensorRequest<'_>) -> Result<NativeHandle> {
        self.check(EngineOp::AllocateTensor)?;
        self.inner.allocate_tensor(request)
    }

    fn create_string_tensor(&self, request: &StringTensorRequest<'_>) -> Result<NativeHandle> {
        self.check(EngineOp::CreateStringTensor)?;
        self.inner.create_string_tensor(request)
    }

    fn release_tensor(&self, handle: NativeHandle) -> Result<()> {
        self.check(EngineOp::ReleaseTensor)?;
        self.inner.release_tensor(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_engine_heals() {
        let engine = FailingEngine::new(&[EngineOp::CreateAllocator]);
        let err = engine.create_allocator().unwrap_err();
        assert!(err.is_native_failure());
        engine.heal(EngineOp::CreateAllocator);
        let handle = engine.create_allocator().unwrap();
        engine.release_allocator(handle).unwrap();
    }

    #[test]
    fn test_recording_engine_logs_rejected_calls() {
        let engine = RecordingEngine::new();
        let bogus = AllocatorHandle::from_raw(0xdead);
        assert!(engine.release_allocator(bogus).is_err());
        assert_eq!(engine.calls(), vec![EngineCall::ReleaseAllocator(bogus)]);
    }
}
