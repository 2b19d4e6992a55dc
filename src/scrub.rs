//! Attribute value scrubbing.
//!
//! Values reaching the scrubber have already had XML entities decoded by the
//! parser. In the default (hardened) mode the scrubber additionally decodes
//! percent escapes, HTML character references and CSS escapes, and drops
//! whitespace and control characters, before looking for a script scheme.
//! Decoding only feeds the decision; a kept value is stored as written.

use crate::config::ScrubbingConfig;
use crate::gate::is_trim_char;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Attributes holding a link reference.
pub const LINK_ATTRIBUTES: &[&str] = &["href", "xlink:href"];

const SCRIPT_SCHEME: &str = "javascript:";

/// Rounds of decoding before giving up on a fixed point.
const MAX_DECODE_ROUNDS: usize = 4;

fn percent_escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%([0-9A-Fa-f]{2})").expect("valid regex"))
}

fn numeric_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&#(?:[xX]([0-9A-Fa-f]{1,8})|([0-9]{1,10}));?").expect("valid regex")
    })
}

fn named_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)&(colon|tab|newline|lpar|rpar|sol|period|amp|quot|apos|lt|gt);?")
            .expect("valid regex")
    })
}

fn css_escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\([0-9A-Fa-f]{1,6})[ \t\n\r\x0C]?").expect("valid regex"))
}

/// Decides whether an attribute value is kept, and in what form.
#[derive(Debug, Clone, Default)]
pub struct AttributeScrubber {
    legacy_matching: bool,
    /// Lowercase scheme names without the colon. Empty means deny-list mode.
    allowed_schemes: Vec<String>,
}

impl AttributeScrubber {
    /// Hardened matching, scheme deny-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Historical checks: case-insensitive `javascript:` prefix on links,
    /// case-sensitive substring on `style`, no decoding.
    pub fn legacy() -> Self {
        Self {
            legacy_matching: true,
            allowed_schemes: Vec::new(),
        }
    }

    pub fn from_config(config: &ScrubbingConfig) -> Self {
        Self {
            legacy_matching: config.legacy_matching,
            allowed_schemes: Vec::new(),
        }
        .with_allowed_schemes(&config.allowed_href_schemes)
    }

    /// Switch links to allow-list mode. Relative references and fragments
    /// stay allowed; listing `data` admits `data:image/*` only.
    pub fn with_allowed_schemes<S: AsRef<str>>(mut self, schemes: &[S]) -> Self {
        self.allowed_schemes = schemes
            .iter()
            .map(|s| s.as_ref().trim().trim_end_matches(':').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy_matching
    }

    /// Scrub one attribute value. `None` means drop the attribute.
    pub fn scrub(&self, name: &str, value: &str) -> Option<String> {
        let cleaned = strip_value(value);

        if LINK_ATTRIBUTES.contains(&name) && !self.is_safe_link(&cleaned) {
            return None;
        }

        if name == "style" && self.style_has_script(&cleaned) {
            return None;
        }

        Some(cleaned)
    }

    fn is_safe_link(&self, value: &str) -> bool {
        let canonical = if self.legacy_matching {
            value.to_ascii_lowercase()
        } else {
            canonicalize(value, false)
        };

        if canonical.starts_with(SCRIPT_SCHEME) {
            return false;
        }

        if self.allowed_schemes.is_empty() {
            return true;
        }

        // `//host/x` inherits the page scheme, so it is external, not relative
        if is_network_path(&canonical) {
            return self.allows_scheme("http") || self.allows_scheme("https");
        }

        match scheme_of(&canonical) {
            None => true,
            Some("data") => {
                self.allows_scheme("data") && canonical["data:".len()..].starts_with("image/")
            }
            Some(scheme) => self.allows_scheme(scheme),
        }
    }

    fn allows_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes.iter().any(|s| s == scheme)
    }

    fn style_has_script(&self, value: &str) -> bool {
        if self.legacy_matching {
            value.contains(SCRIPT_SCHEME)
        } else {
            canonicalize(value, true).contains(SCRIPT_SCHEME)
        }
    }
}

/// Remove NUL bytes and surrounding whitespace.
fn strip_value(value: &str) -> String {
    if value.contains('\0') {
        let stripped: String = value.chars().filter(|&c| c != '\0').collect();
        stripped.trim_matches(is_trim_char).to_string()
    } else {
        value.trim_matches(is_trim_char).to_string()
    }
}

/// Protocol-relative reference. Browsers accept `\` for `/` here.
fn is_network_path(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('/' | '\\'), Some('/' | '\\'))
    )
}

/// Scheme of a URL reference, lowercase, or `None` for relative references.
fn scheme_of(value: &str) -> Option<&str> {
    let colon = value.find(':')?;
    let candidate = &value[..colon];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate)
    } else {
        None
    }
}

/// Decoded, whitespace-free, lowercase form used only for matching.
fn canonicalize(value: &str, css: bool) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        let mut next = decode_percent(&current).into_owned();
        next = decode_references(&next);
        if css {
            next = decode_css_escapes(&next).into_owned();
        }
        next.retain(|c| !(c.is_whitespace() || c.is_control()));
        if next == current {
            break;
        }
        current = next;
    }
    current.to_ascii_lowercase()
}

fn decode_percent(input: &str) -> Cow<'_, str> {
    percent_escape_regex().replace_all(input, |caps: &Captures| {
        match u8::from_str_radix(&caps[1], 16) {
            Ok(byte) if byte.is_ascii() => (byte as char).to_string(),
            _ => caps[0].to_string(),
        }
    })
}

fn decode_references(input: &str) -> String {
    let numeric = numeric_reference_regex().replace_all(input, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string()
    });

    named_reference_regex()
        .replace_all(&numeric, |caps: &Captures| {
            match caps[1].to_ascii_lowercase().as_str() {
                "colon" => ":",
                "tab" => "\t",
                "newline" => "\n",
                "lpar" => "(",
                "rpar" => ")",
                "sol" => "/",
                "period" => ".",
                "amp" => "&",
                "quot" => "\"",
                "apos" => "'",
                "lt" => "<",
                "gt" => ">",
                _ => "",
            }
            .to_string()
        })
        .into_owned()
}

fn decode_css_escapes(input: &str) -> Cow<'_, str> {
    css_escape_regex().replace_all(input, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string()
    })
}
