use std::str::FromStr;

use derive_more::Display;
use thiserror::Error;

/// An unsupported numeric type error.
#[derive(Clone, Debug, Error)]
#[error("unsupported numeric type {_0:?}")]
pub struct UnsupportedNumericTypeError(String);

impl UnsupportedNumericTypeError {
    /// Create a new unsupported numeric type error.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self(name)
    }

    /// Return the name of the unsupported numeric type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A numeric type.
///
/// The set is closed: every payload file holds values of exactly one of these types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum NumericType {
    /// 8-bit signed integer.
    #[display("int8")]
    Int8,
    /// 16-bit signed integer.
    #[display("int16")]
    Int16,
    /// 32-bit signed integer.
    #[display("int32")]
    Int32,
    /// 64-bit signed integer.
    #[display("int64")]
    Int64,
    /// 8-bit unsigned integer.
    #[display("uint8")]
    UInt8,
    /// 16-bit unsigned integer.
    #[display("uint16")]
    UInt16,
    /// 32-bit unsigned integer.
    #[display("uint32")]
    UInt32,
    /// 64-bit unsigned integer.
    #[display("uint64")]
    UInt64,
    /// 16-bit IEEE 754 half-precision float.
    #[display("float16")]
    Float16,
    /// 32-bit IEEE 754 single-precision float.
    #[display("float32")]
    Float32,
    /// 64-bit IEEE 754 double-precision float.
    #[display("float64")]
    Float64,
    /// Complex number of two 32-bit floats.
    #[display("complex64")]
    Complex64,
    /// Complex number of two 64-bit floats.
    #[display("complex128")]
    Complex128,
}

impl NumericType {
    /// All numeric types.
    pub const ALL: [Self; 13] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Complex64,
        Self::Complex128,
    ];

    /// Return the name of the numeric type as written to array descriptions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        }
    }

    /// Return the size of an element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// Return the size of an element in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        self.size() * 8
    }

    /// Return the size of the byte-swappable components of an element.
    ///
    /// This is the element size, except for complex types which are a pair of floats.
    #[must_use]
    pub const fn component_size(self) -> usize {
        if self.is_complex() {
            self.size() / 2
        } else {
            self.size()
        }
    }

    /// Returns true if the numeric type can represent negative values.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    /// Returns true if the numeric type is a signed or unsigned integer.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }

    /// Returns true if the numeric type is a real floating point type.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Returns true if the numeric type is a complex type.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Return the largest value representable by an integer numeric type.
    ///
    /// Returns [`None`] for non-integer types.
    #[must_use]
    pub const fn integer_max(self) -> Option<u64> {
        match self {
            Self::Int8 => Some(i8::MAX as u64),
            Self::Int16 => Some(i16::MAX as u64),
            Self::Int32 => Some(i32::MAX as u64),
            Self::Int64 => Some(i64::MAX as u64),
            Self::UInt8 => Some(u8::MAX as u64),
            Self::UInt16 => Some(u16::MAX as u64),
            Self::UInt32 => Some(u32::MAX as u64),
            Self::UInt64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Return a human readable description of the numeric type.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Int8 => "8-bit signed integer",
            Self::Int16 => "16-bit signed integer",
            Self::Int32 => "32-bit signed integer",
            Self::Int64 => "64-bit signed integer",
            Self::UInt8 => "8-bit unsigned integer",
            Self::UInt16 => "16-bit unsigned integer",
            Self::UInt32 => "32-bit unsigned integer",
            Self::UInt64 => "64-bit unsigned integer",
            Self::Float16 => "16-bit float (IEEE 754 half precision)",
            Self::Float32 => "32-bit float (IEEE 754 single precision)",
            Self::Float64 => "64-bit float (IEEE 754 double precision)",
            Self::Complex64 => "64-bit complex number, made of two 32-bit floats",
            Self::Complex128 => "128-bit complex number, made of two 64-bit floats",
        }
    }
}

impl FromStr for NumericType {
    type Err = UnsupportedNumericTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|numeric_type| numeric_type.name() == s)
            .ok_or_else(|| UnsupportedNumericTypeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_type_names() {
        for numeric_type in NumericType::ALL {
            assert_eq!(numeric_type.to_string(), numeric_type.name());
            assert_eq!(
                numeric_type.name().parse::<NumericType>().unwrap(),
                numeric_type
            );
        }
        let err = "float128".parse::<NumericType>().unwrap_err();
        assert_eq!(err.name(), "float128");
        assert_eq!(err.to_string(), r#"unsupported numeric type "float128""#);
    }

    #[test]
    fn numeric_type_sizes() {
        assert_eq!(NumericType::Int8.size(), 1);
        assert_eq!(NumericType::Float16.bits(), 16);
        assert_eq!(NumericType::Complex64.size(), 8);
        assert_eq!(NumericType::Complex64.component_size(), 4);
        assert_eq!(NumericType::Complex128.component_size(), 8);
        assert!(NumericType::Float32.is_signed());
        assert!(!NumericType::UInt16.is_signed());
        assert!(NumericType::UInt16.is_integer());
        assert!(NumericType::Float16.is_float());
        assert_eq!(NumericType::UInt8.integer_max(), Some(255));
        assert_eq!(NumericType::Int16.integer_max(), Some(32767));
        assert_eq!(NumericType::Float64.integer_max(), None);
    }
}
