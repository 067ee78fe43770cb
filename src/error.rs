//! Error types for the engine

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Engine error type
#[derive(Error, Debug)]
pub enum Error {
    /// Resize or construction with a zero dimension
    #[error("invalid dimensions: {rows} rows x {cols} columns")]
    InvalidDimensions { rows: usize, cols: usize },

    /// Configuration failed validation
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
