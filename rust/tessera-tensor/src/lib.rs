//! Typed tensor construction over aligned buffers, handed to an external native engine.
//!
//! [`TensorAllocator`] is the caller-facing surface: it allocates aligned,
//! native-order buffers, copies typed data into them, checks caller-supplied
//! buffers, and registers the result with a [`NativeEngine`]. The engine itself
//! is an external collaborator reached only through opaque handles.
//! [`LocalEngine`] is an in-process stand-in that keeps the handle registry.

pub mod allocator;
pub mod config;
pub mod engine;
pub mod handle;
mod handle_table;
pub mod local_engine;
pub mod shape;
pub mod tensor;
pub mod tensor_type;

pub use allocator::TensorAllocator;
pub use config::AllocatorConfig;
pub use engine::{NativeEngine, StringTensorRequest, TensorRequest};
pub use handle::{AllocatorHandle, NativeHandle};
pub use local_engine::LocalEngine;
pub use tensor::Tensor;
pub use tensor_type::{TensorElement, TensorType};

pub use tessera_bytes::{AlignedBuffer, ByteOrder, HeapBuffer, TensorMemory, allocate_aligned};
