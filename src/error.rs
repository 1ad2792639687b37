// src/error.rs

//! Crate-wide error type
//!
//! Only data and I/O problems are reported through [`Error`]. Misuse of the
//! API (mixing sets from different sacks, asking a filter for a comparator it
//! does not understand, solver output that breaks its own contract) panics.

use thiserror::Error;

/// Errors returned by fallible operations in this crate
#[derive(Debug, Error)]
pub enum Error {
    /// A checked bitmap access used an id beyond the allocated range
    #[error("Id {id} is out of bitmap range ({size})")]
    OutOfRange { id: u32, size: usize },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Unknown repository: {0}")]
    UnknownRepo(String),

    #[error("Invalid dependency expression: {0}")]
    InvalidReldep(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
