use std::io;

use serde::Serialize;
use serde_json::{
    ser::{Formatter, PrettyFormatter},
    Value,
};
use thiserror::Error;

use crate::Attributes;

/// An array description error.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// Required keys are missing.
    #[error("description is missing required keys {_0:?}")]
    MissingKeys(Vec<String>),
    /// A value is malformed.
    #[error("invalid description: {_0}")]
    InvalidDescription(#[from] serde_json::Error),
}

impl DescriptionError {
    pub(crate) fn check_required_keys(map: &Attributes, keys: &[&str]) -> Result<(), Self> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !map.contains_key(**key))
            .map(ToString::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Self::MissingKeys(missing))
        }
    }
}

/// Serialise a value to JSON with sorted keys, four space indentation, escaped non-ASCII characters and a trailing newline.
///
/// # Errors
/// Returns a [`serde_json::Error`] if `value` cannot be represented as JSON.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = sort_keys(serde_json::to_value(value)?);
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter::new());
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sort_keys).collect()),
        value => value,
    }
}

/// A pretty formatter that escapes every non-ASCII character as `\uXXXX`.
struct AsciiFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl AsciiFormatter<'_> {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_pretty_sorted_ascii() {
        let value = json!({"b": [1, 2], "a": {"z": "é", "y": null}});
        let json = String::from_utf8(to_json_pretty(&value).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{
    "a": {
        "y": null,
        "z": "\u00e9"
    },
    "b": [
        1,
        2
    ]
}
"#
        );
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["a"]["z"], "é");
    }
}
