//! Aligned, native-order byte buffers for handing tensor data to a native engine.
//!
//! The central entry point is [`allocate_aligned`], which over-allocates a raw
//! region by `alignment` bytes and exposes the aligned window inside it as an
//! [`AlignedBuffer`].

pub mod align;
pub mod buffer;
pub mod memory;
pub mod order;

pub use buffer::AlignedBuffer;
pub use memory::{HeapBuffer, TensorMemory};
pub use order::ByteOrder;

use tessera_common::Result;

/// Alignment used when the caller does not ask for a specific one.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Allocates a writable, native-order buffer of exactly `capacity` bytes whose
/// first byte is aligned to `alignment`.
///
/// `alignment` must be a power of two. A `capacity` of zero is allowed and yields
/// an empty buffer at an aligned address.
///
/// # Examples
///
/// ```
/// let buf = tessera_bytes::allocate_aligned(10, 16).unwrap();
/// assert_eq!(buf.len(), 10);
/// assert_eq!(buf.as_ptr() as usize % 16, 0);
///
/// assert!(tessera_bytes::allocate_aligned(4, 6).is_err());
/// ```
pub fn allocate_aligned(capacity: usize, alignment: usize) -> Result<AlignedBuffer> {
    AlignedBuffer::allocate(capacity, alignment)
}
