//! Command implementations for tessera-cmd

pub mod alloc;
pub mod tensor;
pub mod types;
