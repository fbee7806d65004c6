/// Returns `true` if `alignment` is a valid alignment: a power of two (exactly one bit set).
///
/// Zero is not a valid alignment.
///
/// # Examples
///
/// ```
/// use tessera_bytes::align::is_valid_alignment;
///
/// assert!(is_valid_alignment(1));
/// assert!(is_valid_alignment(64));
/// assert!(!is_valid_alignment(0));
/// assert!(!is_valid_alignment(6));
/// ```
#[inline]
pub fn is_valid_alignment(alignment: usize) -> bool {
    alignment.count_ones() == 1
}

/// Returns the distance from `address` forward to the next multiple of `alignment`.
///
/// The result is `0` when `address` is already aligned, and otherwise
/// `alignment - (address & (alignment - 1))`. It is always less than `alignment`.
///
/// # Examples
///
/// ```
/// use tessera_bytes::align::aligned_offset;
///
/// assert_eq!(aligned_offset(0x1000, 16), 0);
/// assert_eq!(aligned_offset(0x1005, 16), 11);
/// assert_eq!(aligned_offset(0x100f, 16), 1);
/// assert_eq!(aligned_offset(0x1005, 1), 0);
/// ```
///
/// # Panics
///
/// This function will panic in debug builds if `alignment` is not a power of 2.
#[inline]
pub fn aligned_offset(address: usize, alignment: usize) -> usize {
    debug_assert!(is_valid_alignment(alignment));
    let rem = address & (alignment - 1);
    if rem == 0 { 0 } else { alignment - rem }
}

/// Checks whether a pointer is aligned to `alignment`.
///
/// Returns `false` for alignments that are not a power of two.
#[inline]
pub fn is_ptr_aligned(ptr: *const u8, alignment: usize) -> bool {
    is_valid_alignment(alignment) && ((ptr as usize) & (alignment - 1)) == 0
}
