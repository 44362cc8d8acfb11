//! # Error Types
//!
//! This module defines the single error type shared by every stage of the chart
//! engine, from scan-parameter validation through MIDI export.
//!
//! Every failure is deterministic (bad configuration, a missing document, a
//! malformed detector output), so nothing here is retried. Errors are raised at
//! the boundary where they are detected and handed back to the caller as one
//! structured value.
//!
//! ## Error Types
//! - `InvalidConfig` - scan parameters, lane ratios, tempo or project settings out of range
//! - `NotFound` - a prerequisite document or clip does not exist
//! - `MalformedDocument` - a JSON/YAML document could not be decoded
//! - `Processing` - the external slicer/detector failed
//! - `OutOfRange` - an editing request pointed outside the chart
//! - `Io` - filesystem failure while reading or writing documents
//!
//! ## Usage
//! ```rust
//! use slitchart::{ChartError, ScanParams};
//!
//! match ScanParams::new(60.0, 0.0, 2000.0, 0.0) {
//!     Ok(_) => unreachable!(),
//!     Err(ChartError::InvalidConfig(message)) => assert!(message.contains("speed")),
//!     Err(e) => panic!("unexpected error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChartError>;

#[derive(Error, Debug)]
pub enum ChartError {
    /// Configuration rejected before any transform ran.
    ///
    /// # Example
    /// ```
    /// # use slitchart::ChartError;
    /// let err = ChartError::InvalidConfig("lane ratios must not be empty".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: lane ratios must not be empty");
    /// ```
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required document (scan metadata, notes) or clip is missing.
    ///
    /// # Example
    /// ```
    /// # use slitchart::ChartError;
    /// let err = ChartError::NotFound("metadata for clip 'intro'".to_string());
    /// assert_eq!(err.to_string(), "Not found: metadata for clip 'intro'");
    /// ```
    #[error("Not found: {0}")]
    NotFound(String),

    /// A document exists but cannot be decoded into one of the accepted shapes.
    #[error("Malformed {document}: {message}")]
    MalformedDocument { document: String, message: String },

    /// The external slicer or detector did not complete successfully.
    #[error("Processing failed: {0}")]
    Processing(String),

    /// An editing request resolved to a position or index outside the chart.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    pub(crate) fn malformed(document: impl Into<String>, message: impl ToString) -> Self {
        ChartError::MalformedDocument {
            document: document.into(),
            message: message.to_string(),
        }
    }
}
