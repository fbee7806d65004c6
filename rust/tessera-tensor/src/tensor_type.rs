//! Element types understood by the native engine.

use std::str::FromStr;

use tessera_common::{Result, error::Error};

/// Element type of a tensor, with the tag values used by the native engine.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
    Float = 0,
    Double = 1,
    String = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint8 = 7,
    Uint16 = 8,
    Uint32 = 9,
    Uint64 = 10,
    Half = 11,
}

/// Element types that can be backed by a caller-supplied byte buffer.
pub const BUFFER_TENSOR_TYPES: &[TensorType] = &[
    TensorType::Int32,
    TensorType::Int64,
    TensorType::Double,
    TensorType::Float,
];

impl TensorType {
    pub const ALL: [TensorType; 12] = [
        TensorType::Float,
        TensorType::Double,
        TensorType::String,
        TensorType::Int8,
        TensorType::Int16,
        TensorType::Int32,
        TensorType::Int64,
        TensorType::Uint8,
        TensorType::Uint16,
        TensorType::Uint32,
        TensorType::Uint64,
        TensorType::Half,
    ];

    /// The tag passed across the native boundary.
    #[inline]
    pub fn value(&self) -> i32 {
        *self as i32
    }

    pub fn from_value(value: i32) -> Option<TensorType> {
        Self::ALL.iter().copied().find(|t| t.value() == value)
    }

    /// Size of one element in bytes, `None` for variable-size strings.
    pub fn bytes_per_element(&self) -> Option<usize> {
        match self {
            TensorType::Int8 | TensorType::Uint8 => Some(1),
            TensorType::Int16 | TensorType::Uint16 | TensorType::Half => Some(2),
            TensorType::Float | TensorType::Int32 | TensorType::Uint32 => Some(4),
            TensorType::Double | TensorType::Int64 | TensorType::Uint64 => Some(8),
            TensorType::String => None,
        }
    }

    /// `true` if tensors of this type may be built directly over a byte buffer.
    pub fn is_buffer_supported(&self) -> bool {
        BUFFER_TENSOR_TYPES.contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TensorType::Float => "FLOAT_TENSOR",
            TensorType::Double => "DOUBLE_TENSOR",
            TensorType::String => "STRING_TENSOR",
            TensorType::Int8 => "INT8_TENSOR",
            TensorType::Int16 => "INT16_TENSOR",
            TensorType::Int32 => "INT32_TENSOR",
            TensorType::Int64 => "INT64_TENSOR",
            TensorType::Uint8 => "UINT8_TENSOR",
            TensorType::Uint16 => "UINT16_TENSOR",
            TensorType::Uint32 => "UINT32_TENSOR",
            TensorType::Uint64 => "UINT64_TENSOR",
            TensorType::Half => "HALF_TENSOR",
        }
    }
}

impl std::fmt::Display for TensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TensorType {
    type Err = Error;

    /// Accepts the engine name (`FLOAT_TENSOR`) or a short lowercase alias (`float`, `f32`).
    fn from_str(s: &str) -> Result<TensorType> {
        let lower = s.to_ascii_lowercase();
        let short = lower.strip_suffix("_tensor").unwrap_or(&lower);
        let t = match short {
            "float" | "f32" => TensorType::Float,
            "double" | "f64" => TensorType::Double,
            "string" | "str" => TensorType::String,
            "int8" | "i8" => TensorType::Int8,
            "int16" | "i16" => TensorType::Int16,
            "int32" | "i32" => TensorType::Int32,
            "int64" | "i64" => TensorType::Int64,
            "uint8" | "u8" => TensorType::Uint8,
            "uint16" | "u16" => TensorType::Uint16,
            "uint32" | "u32" => TensorType::Uint32,
            "uint64" | "u64" => TensorType::Uint64,
            "half" | "f16" => TensorType::Half,
            _ => return Err(Error::invalid_arg("tensor_type", format!("unknown type '{s}'"))),
        };
        Ok(t)
    }
}

/// A fixed-width Rust type that maps onto a buffer-backed tensor type.
pub trait TensorElement: bytemuck::Pod {
    const TENSOR_TYPE: TensorType;
}

impl TensorElement for i32 {
    const TENSOR_TYPE: TensorType = TensorType::Int32;
}

impl TensorElement for i64 {
    const TENSOR_TYPE: TensorType = TensorType::Int64;
}

impl TensorElement for f32 {
    const TENSOR_TYPE: TensorType = TensorType::Float;
}

impl TensorElement for f64 {
    const TENSOR_TYPE: TensorType = TensorType::Double;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_values_round_trip() {
        for t in TensorType::ALL {
            assert_eq!(TensorType::from_value(t.value()), Some(t));
        }
        assert_eq!(TensorType::Float.value(), 0);
        assert_eq!(TensorType::Int64.value(), 6);
        assert_eq!(TensorType::from_value(12), None);
        assert_eq!(TensorType::from_value(-1), None);
    }

    #[test]
    fn test_buffer_supported_set() {
        let supported = TensorType::ALL
            .iter()
            .filter(|t| t.is_buffer_supported())
            .count();
        assert_eq!(supported, 4);
        assert!(!TensorType::String.is_buffer_supported());
        assert!(!TensorType::Int8.is_buffer_supported());
        assert!(!TensorType::Half.is_buffer_supported());
    }

    #[test]
    fn test_element_sizes_match_rust_types() {
        fn size_of_elem<T: TensorElement>() -> usize {
            T::TENSOR_TYPE.bytes_per_element().unwrap()
        }
        assert_eq!(size_of_elem::<i32>(), std::mem::size_of::<i32>());
        assert_eq!(size_of_elem::<i64>(), std::mem::size_of::<i64>());
        assert_eq!(size_of_elem::<f32>(), std::mem::size_of::<f32>());
        assert_eq!(size_of_elem::<f64>(), std::mem::size_of::<f64>());
        assert_eq!(TensorType::String.bytes_per_element(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("float".parse::<TensorType>().unwrap(), TensorType::Float);
        assert_eq!("INT64_TENSOR".parse::<TensorType>().unwrap(), TensorType::Int64);
        assert_eq!("f64".parse::<TensorType>().unwrap(), TensorType::Double);
        assert!("complex".parse::<TensorType>().is_err());
        assert_eq!(TensorType::Uint16.to_string(), "UINT16_TENSOR");
    }
}
