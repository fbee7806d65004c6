//! Shape arithmetic shared by the buffer and string tensor paths.

use tessera_common::{Result, error::Error};

use crate::tensor_type::TensorType;

/// Number of elements described by `dims`.
///
/// An empty shape describes a scalar (one element). Fails with `InvalidArgument`
/// if the product does not fit in `usize`.
pub fn element_count(dims: &[u64]) -> Result<usize> {
    dims.iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::invalid_arg("dims", format!("element count of {dims:?} overflows")))
}

/// Number of bytes needed to hold a tensor of `tensor_type` with shape `dims`.
///
/// Fails with `InvalidArgument` for string tensors or on overflow.
pub fn byte_size(dims: &[u64], tensor_type: TensorType) -> Result<usize> {
    let elem = tensor_type.bytes_per_element().ok_or_else(|| {
        Error::invalid_arg(
            "tensor_type",
            format!("{tensor_type} has no fixed element size"),
        )
    })?;
    element_count(dims)?
        .checked_mul(elem)
        .ok_or_else(|| Error::invalid_arg("dims", format!("byte size of {dims:?} overflows")))
}
