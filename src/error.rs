// SPDX-License-Identifier: MIT
//! Error taxonomy shared by every format processor and the converter

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors raised by record validation, codecs, processors and the pool.
///
/// Boolean `Ok(false)` results are reserved for operations that cleanly did
/// not happen (e.g. saving over an existing file with replacement disabled);
/// everything illegal or malformed surfaces as one of these variants.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
