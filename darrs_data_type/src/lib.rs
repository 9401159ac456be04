//! The numeric type API for the [`darrs`](https://docs.rs/darrs/latest/darrs/index.html) crate.
//!
//! A darr payload file holds values of exactly one [`NumericType`].
//! This crate provides:
//!  - the closed [`NumericType`] enumeration with item sizes, bit widths and signedness,
//!  - the [`Element`] trait tying plain-old-data Rust types to a [`NumericType`],
//!  - the dynamic [`Scalar`] value used for fill values and numeric casts, and
//!  - byte helpers for casting and byte order reversal of raw element bytes.
//!
//! ## Licence
//! `darrs_data_type` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod bytes;
mod element;
mod numeric_type;
mod scalar;

pub use bytes::{
    cast_bytes, convert_from_bytes_slice, convert_to_bytes_vec, reverse_endianness,
    transmute_from_bytes_vec, transmute_to_bytes, transmute_to_bytes_vec,
};
pub use element::Element;
pub use numeric_type::{NumericType, UnsupportedNumericTypeError};
pub use scalar::Scalar;

/// Evaluate an expression with a type alias bound to the [`Element`] type of a [`NumericType`].
///
/// ```
/// # use darrs_data_type::{dispatch_numeric_type, NumericType};
/// let size = dispatch_numeric_type!(NumericType::Float64, T => std::mem::size_of::<T>());
/// assert_eq!(size, 8);
/// ```
#[macro_export]
macro_rules! dispatch_numeric_type {
    ($numeric_type:expr, $t:ident => $body:expr) => {
        match $numeric_type {
            $crate::NumericType::Int8 => {
                type $t = i8;
                $body
            }
            $crate::NumericType::Int16 => {
                type $t = i16;
                $body
            }
            $crate::NumericType::Int32 => {
                type $t = i32;
                $body
            }
            $crate::NumericType::Int64 => {
                type $t = i64;
                $body
            }
            $crate::NumericType::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::NumericType::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::NumericType::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::NumericType::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::NumericType::Float16 => {
                type $t = $crate::half::f16;
                $body
            }
            $crate::NumericType::Float32 => {
                type $t = f32;
                $body
            }
            $crate::NumericType::Float64 => {
                type $t = f64;
                $body
            }
            $crate::NumericType::Complex64 => {
                type $t = $crate::num_complex::Complex32;
                $body
            }
            $crate::NumericType::Complex128 => {
                type $t = $crate::num_complex::Complex64;
                $body
            }
        }
    };
}

#[doc(hidden)]
pub use half;
#[doc(hidden)]
pub use num_complex;
