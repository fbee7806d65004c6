//! Opaque identifiers for objects owned by the native engine.
//!
//! Handles are passed through unchanged; only the engine that issued a handle
//! knows what it refers to.

/// Handle to a tensor living on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(u64);

/// Handle to a native-side tensor allocator (generic, or obtained from a loaded model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocatorHandle(u64);

impl NativeHandle {
    #[inline]
    pub const fn from_raw(raw: u64) -> NativeHandle {
        NativeHandle(raw)
    }

    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl AllocatorHandle {
    #[inline]
    pub const fn from_raw(raw: u64) -> AllocatorHandle {
        AllocatorHandle(raw)
    }

    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tensor#{:#x}", self.0)
    }
}

impl std::fmt::Display for AllocatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "allocator#{:#x}", self.0)
    }
}
