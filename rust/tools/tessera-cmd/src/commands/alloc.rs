//! Aligned allocation command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::utils;

#[derive(Debug, Serialize)]
pub struct AllocationReport {
    pub capacity: usize,
    pub alignment: usize,
    pub raw_capacity: usize,
    pub offset: usize,
    pub base_address: String,
    pub data_address: String,
    pub aligned: bool,
    pub native_order: bool,
}

pub fn run(capacity: usize, alignment: usize, count: usize) -> Result<()> {
    let reports = allocate(capacity, alignment, count)?;
    utils::print_json(&reports)
}

pub fn allocate(capacity: usize, alignment: usize, count: usize) -> Result<Vec<AllocationReport>> {
    // Keep every buffer alive until all are reported so the addresses are distinct.
    let buffers = (0..count)
        .map(|_| tessera_bytes::allocate_aligned(capacity, alignment))
        .collect::<tessera_common::Result<Vec<_>>>()
        .with_context(|| format!("Failed to allocate {capacity} bytes at alignment {alignment}"))?;

    Ok(buffers
        .iter()
        .map(|buf| AllocationReport {
            capacity: buf.len(),
            alignment: buf.alignment(),
            raw_capacity: buf.raw_capacity(),
            offset: buf.offset(),
            base_address: utils::format_address(buf.base_address()),
            data_address: utils::format_address(buf.as_ptr() as usize),
            aligned: buf.is_aligned_at(0, alignment),
            native_order: buf.order().is_native(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_reports() {
        let reports = allocate(100, 32, 3).unwrap();
        assert_eq!(reports.len(), 3);
        for r in &reports {
            assert!(r.aligned);
            assert!(r.native_order);
            assert_eq!(r.raw_capacity, 132);
            assert!(r.offset < 32);
        }
    }

    #[test]
    fn test_allocate_rejects_bad_alignment() {
        assert!(allocate(8, 24, 1).is_err());
    }

    #[test]
    fn test_allocate_rejects_oversized_capacity() {
        let err = allocate(usize::MAX - 8, 64, 1).unwrap_err();
        assert!(err.to_string().contains("Failed to allocate"), "{err}");
    }
}
