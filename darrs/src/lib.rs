//! `darrs` is a Rust library for darr, a disk-based storage format for numeric arrays that favours long-term, tool-independent readability.
//!
//! A darr container is a directory of flat files:
//!  - `arrayvalues.bin` holds the raw element values with no header, in row-major order,
//!  - `arraydescription.json` describes how to interpret them (numeric type, shape, byte order, layout order and format version), and
//!  - `metadata.json` optionally holds user metadata, and is absent when there is none.
//!
//! Payloads are memory mapped for each read or write and the map is released before the operation returns.
//! Arrays grow by appending along their first axis without rewriting existing data.
//!
//! Three kinds of container are supported:
//!  - [`Array`](crate::array::Array): a fixed-shape array store,
//!  - [`RaggedArray`](crate::ragged_array::RaggedArray): a sequence of subarrays that differ only in the length of their first axis, and
//!  - [`VarDimArray`](crate::vardim_array::VarDimArray): a sequence of subarrays with independent shapes.
//!
//! [`open_node`](crate::node::open_node) opens any of them by reading the `darrobject` field of the description.
//!
//! ## Examples
#![cfg_attr(feature = "ndarray", doc = "```rust")]
#![cfg_attr(not(feature = "ndarray"), doc = "```rust,ignore")]
//! # use darrs::array::{Array, ArrayBuilder};
//! # use darrs::data_type::NumericType;
//! # let tmp = tempfile::TempDir::new()?;
//! # let path = tmp.path().join("example.darr");
//! let mut array = ArrayBuilder::new(vec![5, 2], NumericType::Int64)
//!     .fill_value(0i64)
//!     .build(&path)?;
//! array.append(ndarray::array![[1i64, 2], [3, 4], [5, 6]])?;
//! assert_eq!(array.shape(), &[8, 2]);
//! assert_eq!(array.retrieve_rows_elements::<i64>(5..6)?, vec![1, 2]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! The following crate features are enabled by default:
//!  - `ndarray`: [`ndarray`] utility functions for [`Array`](crate::array::Array), [`RaggedArray`](crate::ragged_array::RaggedArray) and [`VarDimArray`](crate::vardim_array::VarDimArray).
//!
//! ## Concurrency
//! A container opened read-only may be shared by any number of readers.
//! A container opened read-write is intended for a single writer.
//! There is no cross-process locking.
//!
//! ## Logging
//! `darrs` logs warnings through the [`log`] facade, for example when a description was written by a newer format version.
//!
//! ## Licence
//! `darrs` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod array;
pub mod metadata_store;
pub mod node;
pub mod ragged_array;
pub mod vardim_array;

pub use darrs_data_type as data_type;
pub use darrs_filesystem as filesystem;
pub use darrs_metadata as metadata;
