//! Test utilities for the tessera crates.
//!
//! - [`engines`]: engine wrappers that record calls or inject native failures
//! - [`data_gen`]: seeded generators for shapes and typed tensor data

pub mod data_gen;
pub mod engines;

pub use data_gen::{RandomElement, random_dims, random_strings, random_values};
pub use engines::{EngineCall, EngineOp, FailingEngine, InjectedFailure, RecordingEngine};
