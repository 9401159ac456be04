use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Attributes, DescriptionError};

/// An unsupported `darrobject` error.
#[derive(Clone, Debug, Error)]
#[error("unsupported darr object type {_0:?}")]
pub struct UnsupportedObjectTypeError(pub String);

/// The kind of darr container a directory holds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum DarrObject {
    /// A fixed-shape array.
    #[default]
    Array,
    /// A ragged array.
    RaggedArray,
    /// A variable-dimension array.
    VarDimArray,
}

impl FromStr for DarrObject {
    type Err = UnsupportedObjectTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Array" => Ok(Self::Array),
            "RaggedArray" => Ok(Self::RaggedArray),
            "VarDimArray" => Ok(Self::VarDimArray),
            _ => Err(UnsupportedObjectTypeError(s.to_string())),
        }
    }
}

fn ragged_array() -> DarrObject {
    DarrObject::RaggedArray
}

fn vardim_array() -> DarrObject {
    DarrObject::VarDimArray
}

/// The summary description of a ragged array, stored in its top-level `arraydescription.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaggedArrayDescription {
    /// The shape shared by every element excluding its first axis.
    pub atom: Vec<u64>,
    /// The darr object type.
    #[serde(default = "ragged_array")]
    pub darrobject: DarrObject,
    /// The format version of the writer.
    pub darrversion: String,
    /// The number of elements.
    pub len: u64,
    /// The numeric type name of the values.
    pub numtype: String,
    /// The total number of values.
    pub size: u64,
}

impl RaggedArrayDescription {
    /// Keys that must be present in a ragged array description.
    pub const REQUIRED_KEYS: [&'static str; 5] = ["atom", "darrversion", "len", "numtype", "size"];

    /// Parse a ragged array description from a JSON object.
    ///
    /// # Errors
    /// Returns a [`DescriptionError`] if a required key is missing or a value is malformed.
    pub fn from_json_map(map: Attributes) -> Result<Self, DescriptionError> {
        DescriptionError::check_required_keys(&map, &Self::REQUIRED_KEYS)?;
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

/// The summary description of a variable-dimension array, stored in its top-level `arraydescription.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDimArrayDescription {
    /// The darr object type.
    #[serde(default = "vardim_array")]
    pub darrobject: DarrObject,
    /// The format version of the writer.
    pub darrversion: String,
    /// The number of elements.
    pub len: u64,
    /// The numeric type name of the values.
    pub numtype: String,
    /// The total number of values.
    pub size: u64,
}

impl VarDimArrayDescription {
    /// Keys that must be present in a variable-dimension array description.
    pub const REQUIRED_KEYS: [&'static str; 4] = ["darrversion", "len", "numtype", "size"];

    /// Parse a variable-dimension array description from a JSON object.
    ///
    /// # Errors
    /// Returns a [`DescriptionError`] if a required key is missing or a value is malformed.
    pub fn from_json_map(map: Attributes) -> Result<Self, DescriptionError> {
        DescriptionError::check_required_keys(&map, &Self::REQUIRED_KEYS)?;
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darr_object_names() {
        assert_eq!("VarDimArray".parse::<DarrObject>().unwrap(), DarrObject::VarDimArray);
        assert_eq!(DarrObject::RaggedArray.to_string(), "RaggedArray");
        assert_eq!(
            "Table".parse::<DarrObject>().unwrap_err().to_string(),
            r#"unsupported darr object type "Table""#
        );
    }

    #[test]
    fn ragged_array_description_json() {
        let description = RaggedArrayDescription {
            atom: vec![],
            darrobject: DarrObject::RaggedArray,
            darrversion: "0.6.1".to_string(),
            len: 3,
            numtype: "int64".to_string(),
            size: 6,
        };
        let value = serde_json::to_value(&description).unwrap();
        assert_eq!(value["darrobject"], "RaggedArray");
        let serde_json::Value::Object(map) = value else {
            unreachable!()
        };
        assert_eq!(
            RaggedArrayDescription::from_json_map(map).unwrap(),
            description
        );
    }
}
