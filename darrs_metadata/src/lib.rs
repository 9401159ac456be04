//! darr array description support for the [`darrs`](https://docs.rs/darrs/latest/darrs/index.html) crate.
//!
//! Every darr container directory holds an `arraydescription.json` file.
//! For a plain array it describes how to interpret the raw `arrayvalues.bin` payload:
//! ```json
//! {
//!     "arrayorder": "C",
//!     "byteorder": "little",
//!     "darrobject": "Array",
//!     "darrversion": "0.6.1",
//!     "numtype": "int64",
//!     "shape": [
//!         8,
//!         2
//!     ]
//! }
//! ```
//!
//! Ragged and variable-dimension arrays hold a summary description instead, see [`RaggedArrayDescription`] and [`VarDimArrayDescription`].
//!
//! ## Licence
//! `darrs_metadata` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod array_description;
mod container_description;
mod format_version;
mod json;

pub use array_description::{ArrayDescription, ArrayOrder, Endianness};
pub use container_description::{
    DarrObject, RaggedArrayDescription, UnsupportedObjectTypeError, VarDimArrayDescription,
};
pub use format_version::{FormatVersion, InvalidFormatVersionError, FORMAT_VERSION};
pub use json::{to_json_pretty, DescriptionError};

/// User metadata: a flat map of keys to JSON values.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
