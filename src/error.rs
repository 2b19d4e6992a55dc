//! Error types for the SVG sanitizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure of a single sanitization call.
///
/// Each variant names the pipeline stage that gave up. Callers treat every
/// variant the same way: the upload is rejected, never partially accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("input rejected: {0}")]
    InputRejected(Rejection),

    #[error("parse error: {0}")]
    Parse(Rejection),

    #[error("serialization error: {0}")]
    Serialization(Rejection),
}

impl SanitizeError {
    /// The rejection carried by this error.
    pub fn rejection(&self) -> &Rejection {
        match self {
            Self::InputRejected(r) | Self::Parse(r) | Self::Serialization(r) => r,
        }
    }

    /// Shortcut for `self.rejection().code`.
    pub fn code(&self) -> RejectionCode {
        self.rejection().code
    }

    /// Stage name used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InputRejected(_) => "gate",
            Self::Parse(_) => "parse",
            Self::Serialization(_) => "serialize",
        }
    }
}

/// Errors outside the sanitization hot path: configuration, I/O, paths.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    Path(String),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection codes, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionCode {
    /// Input was empty after NUL stripping and trimming
    EmptyInput,
    /// Input bytes were not valid UTF-8
    InvalidUtf8,
    /// Input exceeded the configured size cap
    InputTooLarge,
    /// No `<svg` marker in the input
    NotSvg,
    /// XML declaration present but misplaced or malformed
    MalformedDeclaration,
    /// Markup is not well-formed
    InvalidXml,
    /// DOCTYPE declaration present
    DoctypeDetected,
    /// Processing instruction present while they are blocked
    ProcessingInstructionDetected,
    /// No root element
    MissingRoot,
    /// More than one top-level element
    MultipleRoots,
    /// Root element is not `svg`
    WrongRootElement,
    /// Element nesting exceeded the configured maximum
    DepthExceeded,
    /// Filtering removed the root element
    RootRemoved,
}

impl RejectionCode {
    /// Get the string code for this rejection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidUtf8 => "INVALID_UTF8",
            Self::InputTooLarge => "INPUT_TOO_LARGE",
            Self::NotSvg => "NOT_SVG",
            Self::MalformedDeclaration => "MALFORMED_DECLARATION",
            Self::InvalidXml => "INVALID_XML",
            Self::DoctypeDetected => "DOCTYPE_DETECTED",
            Self::ProcessingInstructionDetected => "PROCESSING_INSTRUCTION_DETECTED",
            Self::MissingRoot => "MISSING_ROOT",
            Self::MultipleRoots => "MULTIPLE_ROOTS",
            Self::WrongRootElement => "WRONG_ROOT_ELEMENT",
            Self::DepthExceeded => "DEPTH_EXCEEDED",
            Self::RootRemoved => "ROOT_REMOVED",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an input was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Rejection code
    pub code: RejectionCode,
    /// Human-readable message
    pub message: String,
    /// Byte offset or other location hint (if available)
    pub location: Option<String>,
}

impl Rejection {
    /// Create a new rejection.
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Create a rejection with location.
    pub fn with_location(
        code: RejectionCode,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if let Some(ref location) = self.location {
            write!(f, " (at {})", location)?;
        }
        Ok(())
    }
}
