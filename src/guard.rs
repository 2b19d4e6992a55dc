//! Upload guard.
//!
//! Sits between an upload handler and the sanitizer: caps input size, turns
//! sanitizer results into an accept/reject decision, and keeps counters.

use crate::config::SvgSanitizerConfig;
use crate::error::{GuardError, Rejection, RejectionCode, SanitizeError};
use crate::sanitizer::{Sanitized, SvgSanitizer};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// What the upload handler should do with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDecision {
    /// Store the sanitized markup in place of the original
    Accept(Sanitized),
    /// Refuse the upload
    Reject(SanitizeError),
}

impl UploadDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    /// Sanitized markup, if accepted.
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Accept(s) => Some(&s.markup),
            Self::Reject(_) => None,
        }
    }

    /// Rejection, if refused.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accept(_) => None,
            Self::Reject(e) => Some(e.rejection()),
        }
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardMetrics {
    pub uploads_processed: u64,
    pub uploads_accepted: u64,
    pub uploads_rejected: u64,
    pub elements_stripped: u64,
    pub attributes_stripped: u64,
}

/// Sanitizing gatekeeper for SVG uploads.
pub struct SvgUploadGuard {
    config: SvgSanitizerConfig,
    sanitizer: SvgSanitizer,
    uploads_processed: AtomicU64,
    uploads_accepted: AtomicU64,
    uploads_rejected: AtomicU64,
    elements_stripped: AtomicU64,
    attributes_stripped: AtomicU64,
}

impl SvgUploadGuard {
    /// Create a guard from configuration.
    pub fn new(config: SvgSanitizerConfig) -> Result<Self, GuardError> {
        let sanitizer = SvgSanitizer::from_config(&config)?;
        Ok(Self::with_sanitizer(config, sanitizer))
    }

    /// Create a guard around an already-built sanitizer. Only
    /// `settings.max_input_size` is read from `config`.
    pub fn with_sanitizer(config: SvgSanitizerConfig, sanitizer: SvgSanitizer) -> Self {
        info!(
            max_input_size = config.settings.max_input_size,
            allowed_elements = sanitizer.policy().allowed_elements().len(),
            allowed_attributes = sanitizer.policy().allowed_attributes().len(),
            legacy_matching = sanitizer.scrubber().is_legacy(),
            "SVG upload guard initialized"
        );
        Self {
            config,
            sanitizer,
            uploads_processed: AtomicU64::new(0),
            uploads_accepted: AtomicU64::new(0),
            uploads_rejected: AtomicU64::new(0),
            elements_stripped: AtomicU64::new(0),
            attributes_stripped: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SvgSanitizerConfig {
        &self.config
    }

    pub fn sanitizer(&self) -> &SvgSanitizer {
        &self.sanitizer
    }

    /// Check and sanitize one uploaded file. `name` is only used for logging.
    pub fn process_upload(&self, name: &str, body: &[u8]) -> UploadDecision {
        self.uploads_processed.fetch_add(1, Ordering::Relaxed);

        let max_size = self.config.settings.max_input_size;
        if body.len() > max_size {
            warn!(
                upload = %name,
                size = body.len(),
                max_size = max_size,
                "SVG upload too large"
            );
            return self.reject(SanitizeError::InputRejected(Rejection::new(
                RejectionCode::InputTooLarge,
                format!("Input size {} exceeds maximum {}", body.len(), max_size),
            )));
        }

        match self.sanitizer.sanitize_bytes(body) {
            Ok(sanitized) => {
                self.uploads_accepted.fetch_add(1, Ordering::Relaxed);
                self.elements_stripped
                    .fetch_add(sanitized.report.elements.len() as u64, Ordering::Relaxed);
                self.attributes_stripped
                    .fetch_add(sanitized.report.attributes.len() as u64, Ordering::Relaxed);

                if sanitized.report.is_clean() {
                    debug!(upload = %name, "SVG upload passed unchanged");
                } else {
                    info!(
                        upload = %name,
                        elements_stripped = sanitized.report.elements.len(),
                        attributes_stripped = sanitized.report.attributes.len(),
                        cdata_stripped = sanitized.report.cdata_sections,
                        "SVG upload sanitized"
                    );
                }
                UploadDecision::Accept(sanitized)
            }
            Err(err) => {
                let rejection = err.rejection();
                warn!(
                    upload = %name,
                    stage = err.stage(),
                    code = %rejection.code.as_str(),
                    message = %rejection.message,
                    location = ?rejection.location,
                    "SVG upload rejected"
                );
                self.reject(err)
            }
        }
    }

    fn reject(&self, err: SanitizeError) -> UploadDecision {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
        UploadDecision::Reject(err)
    }

    /// Current counter values.
    pub fn metrics(&self) -> GuardMetrics {
        GuardMetrics {
            uploads_processed: self.uploads_processed.load(Ordering::Relaxed),
            uploads_accepted: self.uploads_accepted.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            elements_stripped: self.elements_stripped.load(Ordering::Relaxed),
            attributes_stripped: self.attributes_stripped.load(Ordering::Relaxed),
        }
    }
}
