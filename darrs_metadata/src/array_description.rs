use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{Attributes, DarrObject, DescriptionError};

/// The byte order of multi-byte elements in a payload file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Little endian.
    #[display("little")]
    Little,
    /// Big endian.
    #[display("big")]
    Big,
}

impl Endianness {
    /// Return the byte order of the target platform.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Returns true if this is the byte order of the target platform.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

/// The memory layout order of a payload file.
///
/// Arrays are always written in row-major order.
/// Column-major payloads written by other tools can still be read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ArrayOrder {
    /// Row-major (C) order: the last index varies fastest.
    #[default]
    #[display("C")]
    C,
    /// Column-major (Fortran) order: the first index varies fastest.
    #[display("F")]
    F,
}

/// The description of a darr array, stored in `arraydescription.json`.
///
/// Fields are declared in key order so the serialised form is sorted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDescription {
    /// The memory layout order.
    pub arrayorder: ArrayOrder,
    /// The byte order.
    pub byteorder: Endianness,
    /// The darr object type.
    #[serde(default)]
    pub darrobject: DarrObject,
    /// The format version of the writer.
    pub darrversion: String,
    /// The numeric type name.
    pub numtype: String,
    /// The array shape. The first dimension is the growable axis.
    pub shape: Vec<u64>,
}

impl ArrayDescription {
    /// Keys that must be present in an array description.
    pub const REQUIRED_KEYS: [&'static str; 5] =
        ["numtype", "shape", "arrayorder", "byteorder", "darrversion"];

    /// Create a new row-major array description in native byte order.
    #[must_use]
    pub fn new(numtype: String, shape: Vec<u64>, darrversion: String) -> Self {
        Self {
            arrayorder: ArrayOrder::C,
            byteorder: Endianness::native(),
            darrobject: DarrObject::Array,
            darrversion,
            numtype,
            shape,
        }
    }

    /// Parse an array description from a JSON object.
    ///
    /// # Errors
    /// Returns [`DescriptionError::MissingKeys`] if any of [`REQUIRED_KEYS`](Self::REQUIRED_KEYS) is absent,
    /// or [`DescriptionError::InvalidDescription`] if a value is malformed.
    pub fn from_json_map(map: Attributes) -> Result<Self, DescriptionError> {
        DescriptionError::check_required_keys(&map, &Self::REQUIRED_KEYS)?;
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    /// Return the number of elements described.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn array_description_parse() {
        let description = ArrayDescription::from_json_map(as_map(json!({
            "arrayorder": "C",
            "byteorder": "big",
            "darrversion": "0.5.0",
            "numtype": "float32",
            "shape": [4, 2]
        })))
        .unwrap();
        assert_eq!(description.darrobject, DarrObject::Array);
        assert_eq!(description.byteorder, Endianness::Big);
        assert_eq!(description.num_elements(), 8);

        let description = ArrayDescription::from_json_map(as_map(json!({
            "arrayorder": "F",
            "byteorder": "little",
            "darrversion": "0.5.0",
            "numtype": "float32",
            "shape": []
        })))
        .unwrap();
        assert_eq!(description.arrayorder, ArrayOrder::F);
    }

    #[test]
    fn array_description_missing_keys() {
        let err = ArrayDescription::from_json_map(as_map(json!({
            "numtype": "float32",
            "shape": [4, 2]
        })))
        .unwrap_err();
        let DescriptionError::MissingKeys(keys) = err else {
            panic!()
        };
        assert_eq!(keys, vec!["arrayorder", "byteorder", "darrversion"]);
    }

    #[test]
    fn array_description_invalid() {
        assert!(matches!(
            ArrayDescription::from_json_map(as_map(json!({
                "arrayorder": "C",
                "byteorder": "little",
                "darrversion": "0.5.0",
                "numtype": "float32",
                "shape": [4, -2]
            }))),
            Err(DescriptionError::InvalidDescription(_))
        ));
    }
}
