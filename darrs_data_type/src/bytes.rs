use crate::{NumericType, Scalar};

/// Transmute from `&[u8]` to `Vec<T>`.
#[must_use]
pub fn convert_from_bytes_slice<T: bytemuck::Pod>(from: &[u8]) -> Vec<T> {
    bytemuck::allocation::pod_collect_to_vec(from)
}

/// Transmute from `Vec<u8>` to `Vec<T>`.
#[must_use]
pub fn transmute_from_bytes_vec<T: bytemuck::Pod>(from: Vec<u8>) -> Vec<T> {
    bytemuck::allocation::try_cast_vec(from)
        .unwrap_or_else(|(_err, from)| convert_from_bytes_slice(&from))
}

/// Convert from `&[T]` to `Vec<u8>`.
#[must_use]
pub fn convert_to_bytes_vec<T: bytemuck::NoUninit>(from: &[T]) -> Vec<u8> {
    bytemuck::allocation::pod_collect_to_vec(from)
}

/// Transmute from `Vec<T>` to `Vec<u8>`.
#[must_use]
pub fn transmute_to_bytes_vec<T: bytemuck::NoUninit>(from: Vec<T>) -> Vec<u8> {
    bytemuck::allocation::try_cast_vec(from)
        .unwrap_or_else(|(_err, from)| convert_to_bytes_vec(&from))
}

/// Transmute from `&[T]` to `&[u8]`.
#[must_use]
pub fn transmute_to_bytes<T: bytemuck::NoUninit>(from: &[T]) -> &[u8] {
    bytemuck::must_cast_slice(from)
}

/// Reverse the byte order of every element in `bytes` of a given numeric type.
///
/// Complex elements have each of their two components swapped independently.
pub fn reverse_endianness(bytes: &mut [u8], numeric_type: NumericType) {
    match numeric_type.component_size() {
        1 => {}
        2 => {
            for chunk in bytes.as_chunks_mut::<2>().0 {
                *chunk = u16::from_ne_bytes(*chunk).swap_bytes().to_ne_bytes();
            }
        }
        4 => {
            for chunk in bytes.as_chunks_mut::<4>().0 {
                *chunk = u32::from_ne_bytes(*chunk).swap_bytes().to_ne_bytes();
            }
        }
        8 => {
            for chunk in bytes.as_chunks_mut::<8>().0 {
                *chunk = u64::from_ne_bytes(*chunk).swap_bytes().to_ne_bytes();
            }
        }
        size => {
            for chunk in bytes.chunks_exact_mut(size) {
                chunk.reverse();
            }
        }
    }
}

/// Cast native endian element bytes from one numeric type to another.
///
/// Trailing bytes that do not form a whole element of `from` are ignored.
#[must_use]
pub fn cast_bytes(bytes: &[u8], from: NumericType, to: NumericType) -> Vec<u8> {
    if from == to {
        return bytes.to_vec();
    }
    let num_elements = bytes.len() / from.size();
    let mut out = Vec::with_capacity(num_elements * to.size());
    for element in bytes.chunks_exact(from.size()) {
        Scalar::from_ne_bytes(from, element).write_ne_bytes(to, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_endianness_components() {
        let mut bytes = transmute_to_bytes_vec(vec![1u32, 2u32]);
        reverse_endianness(&mut bytes, NumericType::Complex64);
        let swapped: Vec<u32> = transmute_from_bytes_vec(bytes);
        assert_eq!(swapped, vec![1u32.swap_bytes(), 2u32.swap_bytes()]);

        let mut bytes = vec![1u8, 2, 3];
        reverse_endianness(&mut bytes, NumericType::UInt8);
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn cast_bytes_between_types() {
        let bytes = transmute_to_bytes_vec(vec![1i16, -2, 300]);
        let cast = cast_bytes(&bytes, NumericType::Int16, NumericType::Float64);
        assert_eq!(
            transmute_from_bytes_vec::<f64>(cast),
            vec![1.0, -2.0, 300.0]
        );
        let cast = cast_bytes(&bytes, NumericType::Int16, NumericType::UInt8);
        assert_eq!(cast, vec![1, 254, 44]);
    }
}
