//! Markup serialization.
//!
//! Output is rebuilt from the tree, so escaping never depends on how the
//! input spelled a character. C0 control characters other than tab, CR and
//! LF cannot appear in XML 1.0 and are dropped.

use crate::error::{Rejection, RejectionCode};
use crate::parser::{Document, Element, Node};

/// Serialize the subtree rooted at the document's root element.
pub fn serialize(doc: &Document) -> Result<String, Rejection> {
    let root = doc.root().ok_or_else(|| {
        Rejection::new(
            RejectionCode::RootRemoved,
            "Root element was removed during filtering",
        )
    })?;

    let mut out = String::new();
    write_element(root, &mut out);
    Ok(out)
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);

    for attr in element.namespaces.iter().chain(&element.attributes) {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        escape_into(&attr.value, true, out);
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(text) => escape_into(text, false, out),
            Node::CData(data) => {
                out.push_str("<![CDATA[");
                out.push_str(&data.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]>");
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(pi) => {
                out.push_str("<?");
                out.push_str(pi);
                out.push_str("?>");
            }
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            '\t' if attribute => out.push_str("&#9;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' | '\n' => out.push(c),
            c if c.is_ascii_control() && c != '\x7F' => {}
            c => out.push(c),
        }
    }
}
