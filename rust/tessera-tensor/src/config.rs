//! Tensor allocator configuration.

use tessera_common::{Result, verify_arg};

use tessera_bytes::{DEFAULT_ALIGNMENT, align::is_valid_alignment};

/// Configuration for a [`crate::TensorAllocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Alignment of the buffers allocated by the typed constructors. Must be a power of two.
    pub alignment: usize,
    /// Upper bound on the data size of a single tensor, in bytes.
    pub max_tensor_bytes: Option<usize>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            max_tensor_bytes: None,
        }
    }
}

impl AllocatorConfig {
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_max_tensor_bytes(mut self, max_tensor_bytes: usize) -> Self {
        self.max_tensor_bytes = Some(max_tensor_bytes);
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(alignment, is_valid_alignment(self.alignment));
        if let Some(max) = self.max_tensor_bytes {
            verify_arg!(max_tensor_bytes, max > 0);
        }
        Ok(())
    }

    /// Checks a tensor's data size against `max_tensor_bytes`.
    pub(crate) fn check_size(&self, bytes: usize) -> Result<()> {
        match self.max_tensor_bytes {
            Some(max) if bytes > max => Err(tessera_common::error::Error::invalid_arg(
                "dims",
                format!("tensor needs {bytes} bytes, limit is {max}"),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AllocatorConfig::default();
        assert_eq!(config.alignment, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_alignment() {
        let config = AllocatorConfig::default().with_alignment(48);
        assert!(config.validate().unwrap_err().is_invalid_arg());
        let config = AllocatorConfig::default().with_alignment(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_size_limit() {
        let config = AllocatorConfig::default().with_max_tensor_bytes(16);
        assert!(config.validate().is_ok());
        assert!(config.check_size(16).is_ok());
        assert!(config.check_size(17).is_err());

        let config = AllocatorConfig {
            max_tensor_bytes: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
