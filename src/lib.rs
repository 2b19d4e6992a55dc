//! SVG upload sanitizer for Zentinel
//!
//! Turns untrusted SVG uploads into markup that is safe to serve, or rejects
//! them with a reason.
//!
//! # Features
//!
//! - Input gate (size, UTF-8, SVG sniffing, XML declaration placement)
//! - XXE prevention: DOCTYPE blocked, entities never expanded
//! - Element/attribute allow-lists with glob deny patterns (`on*`)
//! - Script-scheme scrubbing of `href`, `xlink:href` and `style`
//! - Deterministic re-serialization with CDATA and comments removed
//! - Upload guard with counters for handler integration
//!
//! # Example
//!
//! ```
//! use zentinel_svg_sanitizer::SvgSanitizer;
//!
//! let sanitizer = SvgSanitizer::default();
//! let clean = sanitizer
//!     .sanitize(r#"<svg onload="alert(1)"><script>x()</script><rect/></svg>"#)
//!     .unwrap();
//! assert_eq!(clean, "<svg><rect/></svg>");
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod gate;
pub mod guard;
pub mod parser;
pub mod paths;
pub mod policy;
pub mod sanitizer;
pub mod scrub;
pub mod serializer;

pub use config::{PolicyProfile, SvgSanitizerConfig};
pub use error::{GuardError, Rejection, RejectionCode, SanitizeError};
pub use filter::StripReport;
pub use guard::{GuardMetrics, SvgUploadGuard, UploadDecision};
pub use policy::SanitizationPolicy;
pub use sanitizer::{sanitize_svg, Sanitized, SvgSanitizer};
pub use scrub::AttributeScrubber;
