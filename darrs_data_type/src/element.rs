use num_complex::{Complex32, Complex64};

use crate::{NumericType, Scalar};

/// A trait representing an array element type.
///
/// Elements are plain old data with the in-memory layout of exactly one [`NumericType`].
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    /// The numeric type of the element.
    const NUMERIC_TYPE: NumericType;

    /// Convert the element into a [`Scalar`].
    fn into_scalar(self) -> Scalar;

    /// Cast a [`Scalar`] to the element type.
    fn from_scalar(scalar: Scalar) -> Self;
}

/// Helper macro to implement `Element` for primitive integer types.
macro_rules! impl_element_int {
    ($raw_type:ty, $numeric_type:ident, $variant:ident, $wide:ty, $as_wide:ident) => {
        impl Element for $raw_type {
            const NUMERIC_TYPE: NumericType = NumericType::$numeric_type;

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(<$wide>::from(self))
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            fn from_scalar(scalar: Scalar) -> Self {
                scalar.$as_wide() as $raw_type
            }
        }
    };
}

impl_element_int!(i8, Int8, Int, i64, as_i64);
impl_element_int!(i16, Int16, Int, i64, as_i64);
impl_element_int!(i32, Int32, Int, i64, as_i64);
impl_element_int!(i64, Int64, Int, i64, as_i64);
impl_element_int!(u8, UInt8, UInt, u64, as_u64);
impl_element_int!(u16, UInt16, UInt, u64, as_u64);
impl_element_int!(u32, UInt32, UInt, u64, as_u64);
impl_element_int!(u64, UInt64, UInt, u64, as_u64);

impl Element for half::f16 {
    const NUMERIC_TYPE: NumericType = NumericType::Float16;

    fn into_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    fn from_scalar(scalar: Scalar) -> Self {
        half::f16::from_f64(scalar.as_f64())
    }
}

impl Element for f32 {
    const NUMERIC_TYPE: NumericType = NumericType::Float32;

    fn into_scalar(self) -> Scalar {
        Scalar::Float(f64::from(self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_scalar(scalar: Scalar) -> Self {
        scalar.as_f64() as f32
    }
}

impl Element for f64 {
    const NUMERIC_TYPE: NumericType = NumericType::Float64;

    fn into_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    fn from_scalar(scalar: Scalar) -> Self {
        scalar.as_f64()
    }
}

impl Element for Complex32 {
    const NUMERIC_TYPE: NumericType = NumericType::Complex64;

    fn into_scalar(self) -> Scalar {
        Scalar::Complex(Complex64::new(f64::from(self.re), f64::from(self.im)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_scalar(scalar: Scalar) -> Self {
        let value = scalar.as_complex();
        Complex32::new(value.re as f32, value.im as f32)
    }
}

impl Element for Complex64 {
    const NUMERIC_TYPE: NumericType = NumericType::Complex128;

    fn into_scalar(self) -> Scalar {
        Scalar::Complex(self)
    }

    fn from_scalar(scalar: Scalar) -> Self {
        scalar.as_complex()
    }
}
