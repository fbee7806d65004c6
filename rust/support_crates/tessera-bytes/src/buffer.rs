use tessera_common::{Result, error::Error, verify_arg};

use crate::{
    align::{aligned_offset, is_ptr_aligned, is_valid_alignment},
    memory::TensorMemory,
    order::ByteOrder,
};

/// A fixed-size, directly addressable byte region whose first byte sits on an
/// `alignment` boundary.
///
/// The buffer is carved out of a raw region of `len + alignment` bytes. The raw
/// region is allocated once and is never grown or moved, so pointers obtained
/// from the buffer stay valid for as long as the buffer is alive. The raw
/// region is owned together with the offset of the aligned window, and it is
/// released from its true base when the buffer is dropped.
///
/// New buffers are zero-filled, writable and use the host's native byte order.
pub struct AlignedBuffer {
    /// The raw over-allocated region, including leading slack.
    inner: Vec<u8>,
    /// Offset of the aligned window within `inner`.
    start: usize,
    /// Length of the aligned window.
    len: usize,
    /// Alignment requested at allocation time.
    alignment: usize,
    order: ByteOrder,
    read_only: bool,
}

impl AlignedBuffer {
    /// Allocates a zero-filled buffer of exactly `capacity` bytes, aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error if `alignment` is not a power of two
    /// (zero included), or if `capacity + alignment` exceeds `isize::MAX`. No memory
    /// is allocated in either case. Returns an `OutOfMemory` error if the system
    /// allocator cannot provide the raw region.
    pub fn allocate(capacity: usize, alignment: usize) -> Result<AlignedBuffer> {
        verify_arg!(alignment, is_valid_alignment(alignment));
        let raw_len = capacity
            .checked_add(alignment)
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| {
                Error::invalid_arg(
                    "capacity",
                    format!("{capacity} bytes at alignment {alignment} exceeds the allocation limit"),
                )
            })?;

        let mut inner = Vec::new();
        inner
            .try_reserve_exact(raw_len)
            .map_err(|_| Error::out_of_memory(raw_len))?;
        inner.resize(raw_len, 0u8);
        let start = aligned_offset(inner.as_ptr() as usize, alignment);
        debug_assert!(start < alignment);
        debug_assert!(start + capacity <= raw_len);
        log::trace!(
            "aligned allocation: capacity={capacity} alignment={alignment} raw_len={raw_len} offset={start}"
        );

        Ok(AlignedBuffer {
            inner,
            start,
            len: capacity,
            alignment,
            order: ByteOrder::native(),
            read_only: false,
        })
    }

    /// Allocates a buffer sized for `values` and copies them in, in native byte order.
    pub fn copy_from_typed_slice<T>(values: &[T], alignment: usize) -> Result<AlignedBuffer>
    where
        T: bytemuck::NoUninit,
    {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let mut buf = AlignedBuffer::allocate(bytes.len(), alignment)?;
        buf.as_mut_slice()?.copy_from_slice(bytes);
        Ok(buf)
    }

    /// Returns the length of the aligned window, in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the aligned window is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment the buffer was allocated with.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Offset of the aligned window from the start of the raw region.
    #[inline]
    pub fn offset(&self) -> usize {
        self.start
    }

    /// Size of the raw region backing this buffer (`len + alignment`).
    #[inline]
    pub fn raw_capacity(&self) -> usize {
        self.inner.len()
    }

    /// Address of the first byte of the raw region.
    #[inline]
    pub fn base_address(&self) -> usize {
        self.inner.as_ptr() as usize
    }

    /// Returns a raw pointer to the first byte of the aligned window.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.inner[self.start..].as_ptr()
    }

    /// Returns a mutable raw pointer to the first byte of the aligned window.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidOperation` error if the buffer is read-only.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> Result<*mut u8> {
        Ok(self.as_mut_slice()?.as_mut_ptr())
    }

    /// Returns the aligned window as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner[self.start..self.start + self.len]
    }

    /// Returns the aligned window as a mutable byte slice.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidOperation` error if the buffer is read-only.
    #[inline]
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        if self.read_only {
            return Err(Error::invalid_operation("write to read-only buffer"));
        }
        let end = self.start + self.len;
        Ok(&mut self.inner[self.start..end])
    }

    /// Reinterprets the aligned window as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error if the window length is not a multiple of
    /// `size_of::<T>()` or the buffer alignment is too small for `T`.
    pub fn typed_data<T>(&self) -> Result<&[T]>
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::try_cast_slice(self.as_slice()).map_err(cast_error::<T>)
    }

    /// Reinterprets the aligned window as a mutable slice of `T`.
    pub fn typed_data_mut<T>(&mut self) -> Result<&mut [T]>
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        bytemuck::try_cast_slice_mut(self.as_mut_slice()?).map_err(cast_error::<T>)
    }

    /// Copies `values` into the start of the aligned window.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is read-only or the values do not fit.
    pub fn write_typed<T>(&mut self, values: &[T]) -> Result<()>
    where
        T: bytemuck::NoUninit,
    {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        verify_arg!(values, bytes.len() <= self.len);
        self.as_mut_slice()?[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Returns the declared byte order.
    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Changes the declared byte order. The bytes themselves are not touched.
    pub fn with_order(mut self, order: ByteOrder) -> AlignedBuffer {
        self.order = order;
        self
    }

    /// Returns `true` if writes through this buffer are rejected.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the buffer: subsequent mutable access fails.
    pub fn into_read_only(mut self) -> AlignedBuffer {
        self.read_only = true;
        self
    }

    /// Checks whether the aligned window is aligned to `alignment` at byte `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is greater than the buffer's length.
    pub fn is_aligned_at(&self, offset: usize, alignment: usize) -> bool {
        assert!(offset <= self.len);
        is_ptr_aligned(self.inner[self.start + offset..].as_ptr(), alignment)
    }
}

impl std::ops::Deref for AlignedBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .field("internal_offset", &self.start)
            .field("internal_cap", &self.inner.len())
            .field("order", &self.order)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl TensorMemory for AlignedBuffer {
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn is_direct(&self) -> bool {
        true
    }

    fn order(&self) -> ByteOrder {
        self.order
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[cold]
fn cast_error<T>(e: bytemuck::PodCastError) -> Error {
    Error::invalid_arg(
        "T",
        format!("cannot view buffer as {}: {e}", std::any::type_name::<T>()),
    )
}
