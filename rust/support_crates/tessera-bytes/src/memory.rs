//! `TensorMemory`: the properties a byte buffer reports before it is handed to a native engine.

use crate::order::ByteOrder;

/// A byte buffer that can be offered to a native tensor engine.
///
/// The engine reads the bytes in place, so it cares about more than the contents:
/// whether the memory can move under it, which byte order the elements use, and
/// whether the buffer may be written.
pub trait TensorMemory {
    /// The buffer contents.
    fn as_bytes(&self) -> &[u8];

    /// `true` if the memory is addressable by raw pointer and never relocated
    /// while the buffer is alive.
    fn is_direct(&self) -> bool;

    /// Declared byte order of the multi-byte elements stored in the buffer.
    fn order(&self) -> ByteOrder;

    /// `true` if the buffer rejects writes.
    fn is_read_only(&self) -> bool;

    /// Address of the first byte.
    fn address(&self) -> usize {
        self.as_bytes().as_ptr() as usize
    }
}

/// A buffer backed by a plain `Vec<u8>`.
///
/// The vector's storage may be reallocated and moved, so a `HeapBuffer` is never
/// considered direct memory.
#[derive(Debug, Clone, Default)]
pub struct HeapBuffer {
    data: Vec<u8>,
    order: ByteOrder,
}

impl HeapBuffer {
    pub fn from_vec(data: Vec<u8>) -> HeapBuffer {
        HeapBuffer {
            data,
            order: ByteOrder::native(),
        }
    }

    /// Creates a buffer holding a copy of `values` in native byte order.
    pub fn from_typed<T>(values: &[T]) -> HeapBuffer
    where
        T: bytemuck::NoUninit,
    {
        HeapBuffer::from_vec(bytemuck::cast_slice(values).to_vec())
    }

    pub fn with_order(mut self, order: ByteOrder) -> HeapBuffer {
        self.order = order;
        self
    }
}

impl TensorMemory for HeapBuffer {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn is_direct(&self) -> bool {
        false
    }

    fn order(&self) -> ByteOrder {
        self.order
    }

    fn is_read_only(&self) -> bool {
        false
    }
}

impl<M> TensorMemory for Box<M>
where
    M: TensorMemory + ?Sized,
{
    fn as_bytes(&self) -> &[u8] {
        (**self).as_bytes()
    }

    fn is_direct(&self) -> bool {
        (**self).is_direct()
    }

    fn order(&self) -> ByteOrder {
        (**self).order()
    }

    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }

    fn address(&self) -> usize {
        (**self).address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AlignedBuffer;

    #[test]
    fn test_heap_buffer_properties() {
        let buf = HeapBuffer::from_typed(&[1u32, 2, 3]);
        assert_eq!(buf.as_bytes().len(), 12);
        assert!(!buf.is_direct());
        assert!(!buf.is_read_only());
        assert!(buf.order().is_native());
        assert_eq!(&buf.as_bytes()[..4], &1u32.to_ne_bytes());

        let buf = HeapBuffer::default().with_order(ByteOrder::non_native());
        assert!(buf.as_bytes().is_empty());
        assert!(!buf.order().is_native());
    }

    #[test]
    fn test_boxed_memory_delegates() {
        let aligned = AlignedBuffer::allocate(8, 16).unwrap().into_read_only();
        let expected = aligned.as_ptr() as usize;
        let boxed: Box<dyn TensorMemory> = Box::new(aligned);
        assert!(boxed.is_direct());
        assert!(boxed.is_read_only());
        assert_eq!(boxed.address(), expected);
        assert_eq!(boxed.as_bytes().len(), 8);
    }
}
