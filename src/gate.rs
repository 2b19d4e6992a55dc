//! Cheap pre-checks run before parsing.
//!
//! The gate is a heuristic. The parser has the final word on structure.

use crate::error::{Rejection, RejectionCode};
use std::borrow::Cow;

/// Characters trimmed from both ends of the input and of attribute values.
pub(crate) fn is_trim_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Strip NUL bytes and surrounding whitespace.
pub fn normalize_input(text: &str) -> Cow<'_, str> {
    if text.contains('\0') {
        let stripped: String = text.chars().filter(|&c| c != '\0').collect();
        Cow::Owned(stripped.trim_matches(is_trim_char).to_string())
    } else {
        Cow::Borrowed(text.trim_matches(is_trim_char))
    }
}

/// Decode raw bytes as UTF-8.
pub fn decode_input(data: &[u8]) -> Result<&str, Rejection> {
    std::str::from_utf8(data).map_err(|e| {
        Rejection::with_location(
            RejectionCode::InvalidUtf8,
            "Input is not valid UTF-8",
            format!("byte {}", e.valid_up_to()),
        )
    })
}

/// Whether already-normalized text looks like an SVG document.
pub fn is_likely_svg(text: &str) -> bool {
    check_input(text).is_ok()
}

/// Run the gate on already-normalized text.
pub fn check_input(text: &str) -> Result<(), Rejection> {
    if text.is_empty() {
        return Err(Rejection::new(RejectionCode::EmptyInput, "Input is empty"));
    }

    if !text.contains("<svg") {
        return Err(Rejection::new(
            RejectionCode::NotSvg,
            "Input does not contain an <svg element",
        ));
    }

    if text.contains("<?xml") && !starts_with_declaration(text) {
        return Err(Rejection::new(
            RejectionCode::MalformedDeclaration,
            "XML declaration must appear once, at the very start of the input",
        ));
    }

    Ok(())
}

/// Equivalent of `^<\?xml[^>]*\?>`.
fn starts_with_declaration(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("<?xml") else {
        return false;
    };
    match rest.find('>') {
        Some(end) => rest[..end].ends_with('?'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_nul_and_whitespace() {
        assert_eq!(normalize_input("  <svg/>\n"), "<svg/>");
        assert_eq!(normalize_input("\0<s\0vg/>\0 "), "<svg/>");
        assert!(matches!(normalize_input("<svg/>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_empty_rejected() {
        let err = check_input("").unwrap_err();
        assert_eq!(err.code, RejectionCode::EmptyInput);
    }

    #[test]
    fn test_requires_svg_marker() {
        assert!(is_likely_svg("<svg/>"));
        assert!(is_likely_svg("<!-- logo --><svg xmlns=\"http://www.w3.org/2000/svg\"/>"));
        let err = check_input("<html><body>hi</body></html>").unwrap_err();
        assert_eq!(err.code, RejectionCode::NotSvg);
    }

    #[test]
    fn test_declaration_at_start_accepted() {
        assert!(is_likely_svg(r#"<?xml version="1.0" encoding="UTF-8"?><svg/>"#));
        assert!(is_likely_svg("<?xml?>\n<svg/>"));
    }

    #[test]
    fn test_declaration_not_at_start_rejected() {
        let err = check_input(r#"<svg/><?xml version="1.0"?>"#).unwrap_err();
        assert_eq!(err.code, RejectionCode::MalformedDeclaration);
    }

    #[test]
    fn test_unterminated_declaration_rejected() {
        assert!(!is_likely_svg(r#"<?xml version="1.0"<svg/>"#));
        assert!(!is_likely_svg(r#"<?xml version="1.0"><svg/>"#));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = decode_input(&[b'<', b's', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err.code, RejectionCode::InvalidUtf8);
        assert_eq!(err.location.as_deref(), Some("byte 2"));
    }
}
