use std::{cmp::Ordering, fmt::Display, str::FromStr};

use thiserror::Error;

/// The darr format version written by this implementation.
///
/// Descriptions written by newer versions can still be opened, but a warning is emitted.
pub const FORMAT_VERSION: &str = "0.6.1";

/// An invalid format version error.
#[derive(Clone, Debug, Error)]
#[error("invalid format version {_0:?}")]
pub struct InvalidFormatVersionError(String);

/// A dotted numeric format version, such as `0.6.1`.
///
/// Missing trailing components compare as zero, so `0.6` equals `0.6.0`.
/// Anything after the first non-numeric component (e.g. `0.6.1.dev2` or `0.6.1+3.g2a6b`) is ignored.
#[derive(Clone, Debug)]
pub struct FormatVersion {
    components: Vec<u64>,
}

impl FormatVersion {
    /// Return the numeric components of the version.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or_default()
    }
}

impl FromStr for FormatVersion {
    type Err = InvalidFormatVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let release = s
            .trim()
            .trim_start_matches('v')
            .split(['+', '-'])
            .next()
            .unwrap_or_default();
        let components: Vec<u64> = release
            .split('.')
            .map_while(|component| component.parse::<u64>().ok())
            .collect();
        if components.is_empty() {
            Err(InvalidFormatVersionError(s.to_string()))
        } else {
            Ok(Self { components })
        }
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", components.join("."))
    }
}

impl Ord for FormatVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for FormatVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FormatVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for FormatVersion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> FormatVersion {
        s.parse().unwrap()
    }

    #[test]
    fn format_version_ordering() {
        assert!(version("0.6.1") > version("0.5.3"));
        assert!(version("0.10.0") > version("0.9.9"));
        assert_eq!(version("0.6"), version("0.6.0"));
        assert_eq!(version("0.6.1+12.g3a4b"), version("0.6.1"));
        assert_eq!(version("0.6.1.dev3").components(), &[0, 6, 1]);
        assert!(version("1.0.0") > version(FORMAT_VERSION));
        assert_eq!(version("v0.2.2").to_string(), "0.2.2");
    }

    #[test]
    fn format_version_invalid() {
        assert!("".parse::<FormatVersion>().is_err());
        assert!("unknown".parse::<FormatVersion>().is_err());
    }
}
