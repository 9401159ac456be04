use num_complex::Complex64;

use crate::{Element, NumericType, dispatch_numeric_type};

/// A dynamically typed numeric value.
///
/// Scalars are used for fill values and for casting elements between numeric types.
/// Casts follow the semantics of Rust `as` conversions: float to integer conversions saturate,
/// complex values keep their real part when cast to a real type and real values gain a zero imaginary part.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A real float.
    Float(f64),
    /// A complex float.
    Complex(Complex64),
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
impl Scalar {
    /// Return the scalar as a signed integer.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::UInt(v) => v as i64,
            Self::Float(v) => v as i64,
            Self::Complex(v) => v.re as i64,
        }
    }

    /// Return the scalar as an unsigned integer.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Int(v) => v as u64,
            Self::UInt(v) => v,
            Self::Float(v) => v as u64,
            Self::Complex(v) => v.re as u64,
        }
    }

    /// Return the scalar as a real float.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::UInt(v) => v as f64,
            Self::Float(v) => v,
            Self::Complex(v) => v.re,
        }
    }

    /// Return the scalar as a complex float.
    #[must_use]
    pub fn as_complex(self) -> Complex64 {
        match self {
            Self::Complex(v) => v,
            _ => Complex64::new(self.as_f64(), 0.0),
        }
    }

    /// Returns true if the scalar is complex.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    /// Decode a scalar from the native endian bytes of one element of `numeric_type`.
    ///
    /// # Panics
    /// Panics if the length of `bytes` is not the size of `numeric_type`.
    #[must_use]
    pub fn from_ne_bytes(numeric_type: NumericType, bytes: &[u8]) -> Self {
        dispatch_numeric_type!(numeric_type, T => bytemuck::pod_read_unaligned::<T>(bytes).into_scalar())
    }

    /// Append the native endian bytes of the scalar cast to `numeric_type` to `out`.
    pub fn write_ne_bytes(self, numeric_type: NumericType, out: &mut Vec<u8>) {
        dispatch_numeric_type!(numeric_type, T => {
            out.extend_from_slice(bytemuck::bytes_of(&T::from_scalar(self)));
        });
    }

    /// Return the native endian bytes of the scalar cast to `numeric_type`.
    #[must_use]
    pub fn to_ne_bytes(self, numeric_type: NumericType) -> Vec<u8> {
        let mut out = Vec::with_capacity(numeric_type.size());
        self.write_ne_bytes(numeric_type, &mut out);
        out
    }
}

impl<T: Element> From<T> for Scalar {
    fn from(value: T) -> Self {
        value.into_scalar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_casts() {
        assert_eq!(Scalar::Float(-1.5).as_i64(), -1);
        assert_eq!(Scalar::Float(-1.5).as_u64(), 0);
        assert_eq!(Scalar::Int(-1).as_u64(), u64::MAX);
        assert_eq!(Scalar::UInt(3).as_complex(), Complex64::new(3.0, 0.0));
        assert_eq!(Scalar::Complex(Complex64::new(2.0, 5.0)).as_f64(), 2.0);
        assert!(Scalar::from(num_complex::Complex32::new(1.0, 1.0)).is_complex());
    }

    #[test]
    fn scalar_bytes() {
        let bytes = Scalar::Int(-2).to_ne_bytes(NumericType::Int16);
        assert_eq!(bytes, (-2i16).to_ne_bytes());
        assert_eq!(
            Scalar::from_ne_bytes(NumericType::Int16, &bytes),
            Scalar::Int(-2)
        );
        let bytes = Scalar::Float(0.5).to_ne_bytes(NumericType::Float16);
        assert_eq!(bytes, half::f16::from_f32(0.5).to_ne_bytes());
        let bytes = Scalar::Float(0.5).to_ne_bytes(NumericType::Complex128);
        assert_eq!(bytes.len(), 16);
        assert_eq!(
            Scalar::from_ne_bytes(NumericType::Complex128, &bytes),
            Scalar::Complex(Complex64::new(0.5, 0.0))
        );
    }
}
