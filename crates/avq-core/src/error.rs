//! Error handling for the AVQ coding core
//!
//! Frame-level entry points report failures through [`AvqError`]. The lattice
//! and multiplexer internals never fail: malformed indices are clamped and
//! budget overflows zero the offending subvector, so a corrupt bitstream
//! degrades the output instead of stalling the stream.

#![allow(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Result type alias for AVQ operations
pub type Result<T> = std::result::Result<T, AvqError>;

/// Error type for AVQ encoder/decoder operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvqError {
    /// Invalid configuration
    #[error("Invalid AVQ configuration: {details}")]
    InvalidConfig { details: String },

    /// Invalid frame size
    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// Buffer too small for operation
    #[error("Buffer too small: need {needed} soft bits, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Soft bit that is neither the G.192 zero nor one codeword
    #[error("Invalid soft bit 0x{value:04X} at position {position}")]
    InvalidSoftBit { position: usize, value: u16 },

    /// Unknown G.192 synchronisation word
    #[error("Invalid G.192 sync word 0x{value:04X}")]
    InvalidSyncWord { value: u16 },

    /// Invalid side information or coefficient input
    #[error("Invalid input: {details}")]
    InvalidInput { details: String },
}

impl AvqError {
    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput {
            details: details.into(),
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors concern a single frame; the session state stays
    /// usable and the next frame can be processed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig { .. } => false,

            Self::InvalidFrameSize { .. }
            | Self::BufferTooSmall { .. }
            | Self::InvalidSoftBit { .. }
            | Self::InvalidSyncWord { .. }
            | Self::InvalidInput { .. } => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. } => ErrorCategory::Configuration,

            Self::InvalidFrameSize { .. } | Self::InvalidInput { .. } => ErrorCategory::Processing,

            Self::BufferTooSmall { .. } => ErrorCategory::Memory,

            Self::InvalidSoftBit { .. } | Self::InvalidSyncWord { .. } => ErrorCategory::Bitstream,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and parameter errors
    Configuration,
    /// Frame processing errors
    Processing,
    /// Buffer sizing errors
    Memory,
    /// Malformed G.192 soft-bit streams
    Bitstream,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Processing => write!(f, "Processing"),
            Self::Memory => write!(f, "Memory"),
            Self::Bitstream => write!(f, "Bitstream"),
        }
    }
}
