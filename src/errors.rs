//! Error types for the conversion engine
//!
//! Three tiers, matching how each failure is handled:
//! - `ConversionError` / `ParseError`: fatal for the whole document
//!   (malformed XML, unsupported root element).
//! - `EngineError`: a walker invariant was violated. Aborts the current
//!   part's output; remaining parts are still attempted.
//! - Skipped elements: per-element recoverable problems (unknown clef
//!   sign, malformed numeric attribute). The element is dropped, a
//!   `SkippedElement` record is appended to the report, and the walk
//!   continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level conversion error type
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// Fatal XML parsing error
    #[error("XML parsing failed: {0}")]
    Parse(#[from] ParseError),
}

/// Fatal XML parsing errors
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// XML is malformed (not well-formed)
    #[error("invalid XML: {0}")]
    InvalidXml(String),

    /// MusicXML format not supported (e.g., timewise instead of partwise)
    #[error("unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),

    /// Required structural element is missing
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// An attribute or text value failed to parse
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Walker invariant violations.
///
/// These indicate a bug in the engine's state machine, not bad input:
/// the part being converted is abandoned and reported as failed.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("scope stack empty while closing a {0} scope")]
    EmptyScopeStack(&'static str),

    #[error("output scope handle {0} is not the innermost open scope")]
    ScopeOrderViolation(usize),
}

/// Information about an element that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedElement {
    /// MusicXML element tag name (e.g., "figured-bass")
    pub element: String,

    /// Measure number where the element appears, if known
    pub measure: Option<u32>,

    /// Part ID where the element appears
    pub part: Option<String>,

    /// Human-readable explanation of why it was skipped
    pub reason: String,
}
