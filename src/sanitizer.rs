//! Sanitization pipeline: gate, parse, filter, serialize.

use crate::config::SvgSanitizerConfig;
use crate::error::{GuardError, SanitizeError};
use crate::filter::{filter_document, StripReport};
use crate::gate::{check_input, decode_input, normalize_input};
use crate::parser::{parse_svg, ParseOptions};
use crate::policy::SanitizationPolicy;
use crate::scrub::AttributeScrubber;
use crate::serializer::serialize;
use tracing::debug;

/// Output of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// Cleaned markup, root element only, no XML declaration
    pub markup: String,
    /// What the filter removed
    pub report: StripReport,
}

/// Sanitizer holding one policy.
///
/// `sanitize*` borrow `&self` and may run concurrently from many threads.
/// Changing the policy needs `&mut self`, so it can only happen while no
/// pass is in flight.
#[derive(Debug, Clone, Default)]
pub struct SvgSanitizer {
    policy: SanitizationPolicy,
    scrubber: AttributeScrubber,
    parse_options: ParseOptions,
}

impl SvgSanitizer {
    /// Create a sanitizer with the given policy and default scrubbing/parsing.
    pub fn new(policy: SanitizationPolicy) -> Self {
        Self {
            policy,
            scrubber: AttributeScrubber::new(),
            parse_options: ParseOptions::default(),
        }
    }

    /// Build policy, scrubber and parser limits from configuration.
    pub fn from_config(config: &SvgSanitizerConfig) -> Result<Self, GuardError> {
        Ok(Self {
            policy: SanitizationPolicy::from_config(&config.policy)?,
            scrubber: AttributeScrubber::from_config(&config.scrubbing),
            parse_options: ParseOptions::from_config(config),
        })
    }

    pub fn with_scrubber(mut self, scrubber: AttributeScrubber) -> Self {
        self.scrubber = scrubber;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    /// Administrative access to the policy.
    pub fn policy_mut(&mut self) -> &mut SanitizationPolicy {
        &mut self.policy
    }

    pub fn scrubber(&self) -> &AttributeScrubber {
        &self.scrubber
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Sanitize text and return the cleaned markup.
    pub fn sanitize(&self, raw: &str) -> Result<String, SanitizeError> {
        self.sanitize_with_report(raw).map(|s| s.markup)
    }

    /// Sanitize raw bytes; non-UTF-8 input is rejected at the gate.
    pub fn sanitize_bytes(&self, raw: &[u8]) -> Result<Sanitized, SanitizeError> {
        let text = decode_input(raw).map_err(SanitizeError::InputRejected)?;
        self.sanitize_with_report(text)
    }

    /// Sanitize text and report what was removed.
    pub fn sanitize_with_report(&self, raw: &str) -> Result<Sanitized, SanitizeError> {
        let text = normalize_input(raw);
        check_input(&text).map_err(SanitizeError::InputRejected)?;

        let mut doc = parse_svg(&text, &self.parse_options).map_err(SanitizeError::Parse)?;
        let report = filter_document(&mut doc, &self.policy, &self.scrubber);
        let markup = serialize(&doc).map_err(SanitizeError::Serialization)?;

        debug!(
            input_len = raw.len(),
            output_len = markup.len(),
            elements_stripped = report.elements.len(),
            attributes_stripped = report.attributes.len(),
            cdata_stripped = report.cdata_sections,
            "SVG sanitized"
        );

        Ok(Sanitized { markup, report })
    }
}

/// Sanitize with the default strict policy.
pub fn sanitize_svg(raw: &str) -> Result<String, SanitizeError> {
    SvgSanitizer::default().sanitize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionCode;

    fn sanitizer() -> SvgSanitizer {
        SvgSanitizer::from_config(&SvgSanitizerConfig::default()).unwrap()
    }

    #[test]
    fn test_clean_svg_passes_through() {
        let input = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect width="1" height="1" fill="red"/></svg>"#;
        assert_eq!(sanitizer().sanitize(input).unwrap(), input);
    }

    #[test]
    fn test_declaration_and_whitespace_dropped() {
        let input = "\0 <?xml version=\"1.0\"?>\n<svg><g/></svg>\n";
        assert_eq!(sanitizer().sanitize(input).unwrap(), "<svg><g/></svg>");
    }

    #[test]
    fn test_stage_errors() {
        let s = sanitizer();

        let err = s.sanitize("   ").unwrap_err();
        assert!(matches!(err, SanitizeError::InputRejected(_)));
        assert_eq!(err.code(), RejectionCode::EmptyInput);

        let err = s.sanitize("<html><body>hi</body></html>").unwrap_err();
        assert!(matches!(err, SanitizeError::InputRejected(_)));

        let err = s.sanitize("<html><svg/></html>").unwrap_err();
        assert!(matches!(err, SanitizeError::Parse(_)));
        assert_eq!(err.code(), RejectionCode::WrongRootElement);

        let err = s.sanitize(r#"<svg><path d="M0 0"></svg"#).unwrap_err();
        assert!(matches!(err, SanitizeError::Parse(_)));
    }

    #[test]
    fn test_root_removed_is_serialization_error() {
        let mut s = sanitizer();
        assert!(s.policy_mut().remove_allowed_element("svg"));
        let err = s.sanitize("<svg/>").unwrap_err();
        assert!(matches!(err, SanitizeError::Serialization(_)));
        assert_eq!(err.code(), RejectionCode::RootRemoved);
    }

    #[test]
    fn test_sanitize_bytes() {
        let s = sanitizer();
        let out = s.sanitize_bytes(b"<svg onload=\"x\"/>").unwrap();
        assert_eq!(out.markup, "<svg/>");
        assert_eq!(out.report.attributes.len(), 1);

        let err = s.sanitize_bytes(&[0xff, 0xfe, b'<']).unwrap_err();
        assert_eq!(err.code(), RejectionCode::InvalidUtf8);
    }

    #[test]
    fn test_default_helper_uses_strict_policy() {
        let out = sanitize_svg("<svg><script>alert(1)</script></svg>").unwrap();
        assert_eq!(out, "<svg/>");
    }

    #[test]
    fn test_default_matches_default_config() {
        let mut plain = SvgSanitizer::default();
        assert_eq!(plain.policy().snapshot(), sanitizer().policy().snapshot());

        plain.policy_mut().add_allowed_attribute("onbegin");
        let out = plain.sanitize(r#"<svg><rect onbegin="x()"/></svg>"#).unwrap();
        assert_eq!(out, "<svg><rect/></svg>");
        let out = sanitize_svg(r#"<svg><rect onpointerenter="x()"/></svg>"#).unwrap();
        assert_eq!(out, "<svg><rect/></svg>");
    }

    #[test]
    fn test_sanitizer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SvgSanitizer>();
    }
}
