use std::sync::Arc;

use tessera_common::error::{ErrorKind, Precondition};
use tessera_tensor::{
    AllocatorConfig, ByteOrder, HeapBuffer, LocalEngine, NativeEngine, TensorAllocator,
    TensorType, allocate_aligned, local_engine::LocalEngineError,
};
use tessera_testkit::{
    EngineCall, EngineOp, FailingEngine, InjectedFailure, RandomElement, RecordingEngine,
    random_dims, random_strings, random_values,
};

fn recording() -> (Arc<RecordingEngine>, TensorAllocator) {
    let engine = Arc::new(RecordingEngine::new());
    let allocator = TensorAllocator::generic(engine.clone()).unwrap();
    (engine, allocator)
}

/// A buffer rejected by any caller-side check never reaches the engine.
#[test]
fn test_precondition_failures_make_no_engine_calls() {
    let (engine, allocator) = recording();
    engine.clear();

    let err = allocator
        .tensor_from_memory(HeapBuffer::from_typed(&[1.0f32; 4]), &[4], TensorType::Float)
        .unwrap_err();
    assert_eq!(err.precondition_check(), Some(Precondition::NotDirect));

    let buffer = allocate_aligned(16, 64)
        .unwrap()
        .with_order(ByteOrder::non_native());
    let err = allocator
        .tensor_from_memory(buffer, &[4], TensorType::Int32)
        .unwrap_err();
    assert_eq!(err.precondition_check(), Some(Precondition::NonNativeOrder));

    let buffer = allocate_aligned(16, 64).unwrap().into_read_only();
    let err = allocator
        .tensor_from_memory(buffer, &[2], TensorType::Int64)
        .unwrap_err();
    assert_eq!(err.precondition_check(), Some(Precondition::ReadOnly));

    for tensor_type in [TensorType::Int8, TensorType::Uint64, TensorType::Half] {
        let buffer = allocate_aligned(16, 64).unwrap();
        let err = allocator
            .tensor_from_memory(buffer, &[2], tensor_type)
            .unwrap_err();
        assert_eq!(err.precondition_check(), Some(Precondition::UnsupportedType));
        assert!(err.to_string().contains(tensor_type.name()), "{err}");
    }

    let buffer = allocate_aligned(15, 64).unwrap();
    assert!(
        allocator
            .tensor_from_memory(buffer, &[4], TensorType::Float)
            .unwrap_err()
            .is_invalid_arg()
    );
    assert!(allocator.copy_from_i32(&[1, 2], &[3]).is_err());
    assert!(allocator.copy_from_strings(&["a"], &[2]).is_err());

    assert_eq!(engine.call_count(), 0);
}

/// The engine is handed the caller's buffer itself, with the shape and type tag.
#[test]
fn test_engine_receives_buffer_address() {
    let (engine, allocator) = recording();
    let mut buffer = allocate_aligned(6 * 8, 128).unwrap();
    buffer.write_typed(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let address = buffer.as_ptr() as usize;

    let tensor = allocator
        .tensor_from_memory(buffer, &[3, 2], TensorType::Double)
        .unwrap();

    match engine.last_tensor_call().unwrap() {
        EngineCall::AllocateTensor {
            tensor_type,
            type_tag,
            dims,
            address: seen,
            byte_len,
            allocator: owner,
        } => {
            assert_eq!(tensor_type, TensorType::Double);
            assert_eq!(type_tag, TensorType::Double.value());
            assert_eq!(dims, vec![3, 2]);
            assert_eq!(seen, address);
            assert_eq!(byte_len, 48);
            assert_eq!(owner, allocator.handle());
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(tensor.data_address(), Some(address));
}

#[test]
fn test_copy_from_passes_aligned_copy() {
    let (engine, allocator) = recording();
    let data = [7i64, 8, 9];
    let tensor = allocator.copy_from_i64(&data, &[3]).unwrap();
    match engine.last_tensor_call().unwrap() {
        EngineCall::AllocateTensor {
            address, byte_len, ..
        } => {
            assert_ne!(address, data.as_ptr() as usize);
            assert_eq!(address % AllocatorConfig::default().alignment, 0);
            assert_eq!(byte_len, 24);
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(tensor.typed_data::<i64>().unwrap(), &data);
}

#[test]
fn test_string_values_cross_boundary() {
    let (engine, allocator) = recording();
    let values = ["x", "", "zz"];
    let _tensor = allocator.copy_from_strings(&values, &[1, 3]).unwrap();
    let calls = engine.calls();
    assert_eq!(
        calls.last(),
        Some(&EngineCall::CreateStringTensor {
            dims: vec![1, 3],
            values: values.iter().map(|s| s.to_string()).collect(),
            allocator: allocator.handle(),
        })
    );
}

#[test]
fn test_release_order() {
    let (engine, allocator) = recording();
    let tensor = allocator.copy_from_f32(&[1.0], &[1]).unwrap();
    let tensor_handle = tensor.handle();
    let allocator_handle = allocator.handle();
    drop(tensor);
    drop(allocator);
    let calls = engine.calls();
    assert_eq!(
        calls.iter().map(EngineCall::op).collect::<Vec<_>>(),
        vec![
            EngineOp::CreateAllocator,
            EngineOp::AllocateTensor,
            EngineOp::ReleaseTensor,
            EngineOp::ReleaseAllocator,
        ]
    );
    assert_eq!(calls[2], EngineCall::ReleaseTensor(tensor_handle));
    assert_eq!(calls[3], EngineCall::ReleaseAllocator(allocator_handle));
}

/// Engine failures come back as `NativeBridgeFailure` with the engine's own error as source.
#[test]
fn test_native_failure_propagates_unchanged() {
    let engine = Arc::new(
        FailingEngine::new(&[EngineOp::AllocateTensor, EngineOp::CreateStringTensor])
            .with_message("device lost"),
    );
    let allocator = TensorAllocator::generic(engine.clone()).unwrap();

    let err = allocator.copy_from_f32(&[1.0, 2.0], &[2]).unwrap_err();
    assert!(err.is_native_failure());
    match err.kind() {
        ErrorKind::NativeBridgeFailure { context, source } => {
            assert_eq!(context, "allocate_tensor");
            let injected = source.downcast_ref::<InjectedFailure>().unwrap();
            assert_eq!(injected.message, "device lost");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = allocator.copy_from_strings(&["a"], &[1]).unwrap_err();
    assert!(err.is_native_failure());
    assert_eq!(err.precondition_check(), None);

    engine.heal(EngineOp::AllocateTensor);
    assert!(allocator.copy_from_f32(&[1.0, 2.0], &[2]).is_ok());
}

#[test]
fn test_allocator_creation_failure() {
    let engine = Arc::new(FailingEngine::new(&[EngineOp::CreateAllocator]));
    let err = TensorAllocator::generic(engine).unwrap_err();
    assert!(err.is_native_failure());
}

#[test]
fn test_release_failure_reported_by_close() {
    let engine = Arc::new(FailingEngine::new(&[EngineOp::ReleaseTensor]));
    let allocator = TensorAllocator::generic(engine.clone()).unwrap();
    let tensor = allocator.copy_from_i32(&[1], &[1]).unwrap();
    assert!(tensor.close().unwrap_err().is_native_failure());

    // Drop swallows the failure.
    let tensor = allocator.copy_from_i32(&[1], &[1]).unwrap();
    drop(tensor);
}

#[test]
fn test_local_engine_rejects_stale_handles() {
    let engine = Arc::new(LocalEngine::new());
    let allocator = TensorAllocator::generic(engine.clone()).unwrap();
    let tensor = allocator.copy_from_i32(&[1, 2], &[2]).unwrap();
    let handle = tensor.handle();
    tensor.close().unwrap();

    let err = engine.release_tensor(handle).unwrap_err();
    match err.kind() {
        ErrorKind::NativeBridgeFailure { source, .. } => {
            assert_eq!(
                source.downcast_ref::<LocalEngineError>(),
                Some(&LocalEngineError::InvalidTensor(handle))
            );
        }
        other => panic!("unexpected error {other:?}"),
    }

    // A reused slot gets a new generation.
    let tensor = allocator.copy_from_i32(&[3], &[1]).unwrap();
    assert_ne!(tensor.handle(), handle);
    assert!(engine.tensor_record(handle).is_none());
}

fn round_trip<T>(allocator: &TensorAllocator, rng: &mut fastrand::Rng)
where
    T: RandomElement + PartialEq + std::fmt::Debug,
{
    let dims = random_dims(rng, 4, 5);
    let count = tessera_tensor::shape::element_count(&dims).unwrap();
    let data = random_values::<T>(rng, count);
    let tensor = allocator.copy_from(&data, &dims).unwrap();
    assert_eq!(tensor.tensor_type(), T::TENSOR_TYPE);
    assert_eq!(tensor.dims(), &dims[..]);
    assert_eq!(tensor.typed_data::<T>().unwrap(), &data[..]);
}

#[test]
fn test_random_round_trips() {
    let engine = Arc::new(LocalEngine::new());
    let allocator = TensorAllocator::generic(engine.clone()).unwrap();
    let mut rng = fastrand::Rng::with_seed(0x7e55e4a);
    for _ in 0..50 {
        round_trip::<i32>(&allocator, &mut rng);
        round_trip::<i64>(&allocator, &mut rng);
        round_trip::<f32>(&allocator, &mut rng);
        round_trip::<f64>(&allocator, &mut rng);

        let values = random_strings(&mut rng, 4);
        let tensor = allocator.copy_from_strings(&values, &[2, 2]).unwrap();
        assert_eq!(engine.string_values(tensor.handle()).unwrap(), values);
    }
    assert_eq!(engine.live_tensors(), 0);
}
