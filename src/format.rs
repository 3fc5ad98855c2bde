// SPDX-License-Identifier: MIT
//! Supported conversion formats and shared format constants

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConvertError;

/// Canonical date representation used in XML documents and parsing
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Maximum brand name length in UTF-16 code units
pub const MAX_BRAND_NAME_LEN: usize = u16::MAX as usize;

/// Suffix for the temporary sibling written before publishing a save
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Suffix for the optional pre-save backup snapshot
pub const BACKUP_FILE_SUFFIX: &str = ".bak";

/// A bare format token, optionally dot-prefixed: ".bin", "xml", ...
///
/// Rejects path separators, multiple dots and other punctuation.
static FORMAT_TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.?\w+$").expect("format token regex is valid"));

/// Trailing ".ext" extension of a file path
static PATH_EXTENSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\w+$").expect("path extension regex is valid"));

/// Closed enumeration of convertible formats.
///
/// `Unknown` is never a valid processor format; it only exists as a
/// "not determined" sentinel in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Length-prefixed binary format, magic 0x2526
    Binary,
    /// XML document with a `Document` root of `Car` elements
    Xml,
    /// Sentinel for undetermined formats
    Unknown,
}

impl Format {
    /// File extension token identifying this format, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Binary => "bin",
            Format::Xml => "xml",
            Format::Unknown => "",
        }
    }

    /// Checks whether `candidate` is a well-shaped format token that names
    /// this format (case-insensitive, single optional leading dot).
    pub fn matches_token(&self, candidate: &str) -> bool {
        if *self == Format::Unknown || !FORMAT_TOKEN_REGEX.is_match(candidate) {
            return false;
        }
        let normalized = candidate.strip_prefix('.').unwrap_or(candidate);
        normalized.eq_ignore_ascii_case(self.extension())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Binary => "BINARY",
            Format::Xml => "XML",
            Format::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bin" | "binary" => Ok(Format::Binary),
            "xml" => Ok(Format::Xml),
            other => Err(ConvertError::InvalidArgument(format!(
                "unsupported format name: {}",
                other
            ))),
        }
    }
}

/// Extracts the trailing `.ext` token from a path string, if any
pub(crate) fn path_extension(path: &str) -> Option<&str> {
    PATH_EXTENSION_REGEX.find(path).map(|m| m.as_str())
}
