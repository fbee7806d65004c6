//! Tensor type listing command implementation

use anyhow::Result;
use serde::Serialize;
use tessera_tensor::{TensorAllocator, TensorType};

use crate::utils;

#[derive(Debug, Serialize)]
pub struct TypeInfo {
    pub name: &'static str,
    pub tag: i32,
    pub bytes_per_element: Option<usize>,
    pub buffer_supported: bool,
}

pub fn run() -> Result<()> {
    utils::print_json(&describe_types())
}

pub fn describe_types() -> Vec<TypeInfo> {
    let supported = TensorAllocator::supported_tensor_types();
    TensorType::ALL
        .iter()
        .map(|t| TypeInfo {
            name: t.name(),
            tag: t.value(),
            bytes_per_element: t.bytes_per_element(),
            buffer_supported: supported.contains(t),
        })
        .collect()
}
