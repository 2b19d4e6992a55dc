//! SVG document parsing.
//!
//! Uses quick-xml, which never loads DTDs and only understands the five
//! predefined entities plus character references. Any other `&name;`
//! reference fails to unescape and the document is rejected.

use crate::config::SvgSanitizerConfig;
use crate::error::{Rejection, RejectionCode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Name the root element must carry.
pub const SVG_ROOT: &str = "svg";

/// A parsed document. `root` is `None` only after filtering removed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Option<Element>,
}

impl Document {
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

/// One element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name, prefix included
    pub name: String,
    /// Attributes other than namespace declarations
    pub attributes: Vec<Attribute>,
    /// `xmlns` and `xmlns:*` declarations
    pub namespaces: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of an attribute by qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Child elements, skipping text and other nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }
}

/// A name/value pair with the value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, unescaped
    Text(String),
    /// Raw CDATA section content
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// Parser limits and XXE switches.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum element nesting depth
    pub max_depth: usize,
    /// Reject DOCTYPE declarations instead of dropping them
    pub block_doctype: bool,
    /// Reject processing instructions instead of keeping them for the filter
    pub block_processing_instructions: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            block_doctype: true,
            block_processing_instructions: false,
        }
    }
}

impl ParseOptions {
    pub fn from_config(config: &SvgSanitizerConfig) -> Self {
        Self {
            max_depth: config.settings.max_depth,
            block_doctype: config.xxe_prevention.block_doctype,
            block_processing_instructions: config.xxe_prevention.block_processing_instructions,
        }
    }
}

/// Parse text into a document whose root is `<svg>`.
pub fn parse_svg(text: &str, options: &ParseOptions) -> Result<Document, Rejection> {
    if let Some((offset, c)) = text.char_indices().find(|&(_, c)| !is_xml_char(c)) {
        return Err(Rejection::with_location(
            RejectionCode::InvalidXml,
            format!("Character U+{:04X} is not allowed in XML", c as u32),
            format!("byte {}", offset),
        ));
    }

    let mut reader = Reader::from_str(text);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = true;
        config.check_comments = true;
        config.expand_empty_elements = false;
    }

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut seen_event = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            Rejection::with_location(
                RejectionCode::InvalidXml,
                format!("XML parse error: {}", e),
                format!("byte {}", reader.error_position()),
            )
        })?;
        let position = reader.buffer_position() as u64;
        let first = !seen_event;
        seen_event = true;

        match event {
            Event::Start(ref e) => {
                let element = build_element(e, position)?;
                if stack.is_empty() {
                    check_root(&element, root.is_some(), position)?;
                }
                check_depth(stack.len(), options.max_depth, position)?;
                stack.push(element);
            }

            Event::Empty(ref e) => {
                let element = build_element(e, position)?;
                if stack.is_empty() {
                    check_root(&element, root.is_some(), position)?;
                }
                check_depth(stack.len(), options.max_depth, position)?;
                attach(&mut stack, &mut root, element);
            }

            Event::End(_) => match stack.pop() {
                Some(element) => attach(&mut stack, &mut root, element),
                None => {
                    return Err(Rejection::with_location(
                        RejectionCode::InvalidXml,
                        "Unexpected closing tag",
                        format!("byte {}", position),
                    ))
                }
            },

            Event::Text(ref e) => {
                if e.windows(3).any(|w| w == b"]]>") {
                    return Err(Rejection::with_location(
                        RejectionCode::InvalidXml,
                        "Literal ']]>' in character data",
                        format!("byte {}", position),
                    ));
                }
                let text = e.unescape().map_err(|err| {
                    Rejection::with_location(
                        RejectionCode::InvalidXml,
                        format!("Invalid character data: {}", err),
                        format!("byte {}", position),
                    )
                })?;
                check_chars(&text, position)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(Rejection::with_location(
                            RejectionCode::InvalidXml,
                            "Text content outside the root element",
                            format!("byte {}", position),
                        ))
                    }
                }
            }

            Event::CData(ref e) => {
                let content = String::from_utf8_lossy(e).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(content)),
                    None => {
                        return Err(Rejection::with_location(
                            RejectionCode::InvalidXml,
                            "CDATA section outside the root element",
                            format!("byte {}", position),
                        ))
                    }
                }
            }

            Event::Comment(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Comment(String::from_utf8_lossy(e).into_owned()));
                }
            }

            Event::PI(ref e) => {
                if options.block_processing_instructions {
                    return Err(Rejection::with_location(
                        RejectionCode::ProcessingInstructionDetected,
                        "Processing instructions are not allowed",
                        format!("byte {}", position),
                    ));
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::ProcessingInstruction(
                        String::from_utf8_lossy(e).into_owned(),
                    ));
                }
            }

            Event::Decl(_) => {
                if !first {
                    return Err(Rejection::with_location(
                        RejectionCode::InvalidXml,
                        "XML declaration is only allowed at the start of the document",
                        format!("byte {}", position),
                    ));
                }
            }

            // The DTD is never interpreted: internal subsets, entity
            // declarations and external identifiers are all ignored.
            Event::DocType(_) => {
                if options.block_doctype {
                    return Err(Rejection::with_location(
                        RejectionCode::DoctypeDetected,
                        "DOCTYPE declarations are not allowed",
                        format!("byte {}", position),
                    ));
                }
                if root.is_some() || !stack.is_empty() {
                    return Err(Rejection::with_location(
                        RejectionCode::InvalidXml,
                        "DOCTYPE after the root element",
                        format!("byte {}", position),
                    ));
                }
            }

            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(Rejection::new(
            RejectionCode::InvalidXml,
            format!("Unclosed element <{}> at end of input", open.name),
        ));
    }

    match root {
        Some(root) => Ok(Document { root: Some(root) }),
        None => Err(Rejection::new(
            RejectionCode::MissingRoot,
            "Document has no root element",
        )),
    }
}

fn check_root(element: &Element, has_root: bool, position: u64) -> Result<(), Rejection> {
    if has_root {
        return Err(Rejection::with_location(
            RejectionCode::MultipleRoots,
            format!("Second top-level element <{}>", element.name),
            format!("byte {}", position),
        ));
    }
    if element.name != SVG_ROOT {
        return Err(Rejection::new(
            RejectionCode::WrongRootElement,
            format!("Root element is <{}>, expected <{}>", element.name, SVG_ROOT),
        ));
    }
    Ok(())
}

fn check_depth(open: usize, max_depth: usize, position: u64) -> Result<(), Rejection> {
    if open >= max_depth {
        return Err(Rejection::with_location(
            RejectionCode::DepthExceeded,
            format!("Element nesting exceeds maximum depth {}", max_depth),
            format!("byte {}", position),
        ));
    }
    Ok(())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn build_element(e: &BytesStart, position: u64) -> Result<Element, Rejection> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()));
    check_name(&element.name, position)?;
    check_attribute_layout(e.attributes_raw(), &element.name, position)?;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            Rejection::with_location(
                RejectionCode::InvalidXml,
                format!("Invalid attribute on <{}>: {}", element.name, err),
                format!("byte {}", position),
            )
        })?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        check_name(&name, position)?;
        let value = attr.unescape_value().map_err(|err| {
            Rejection::with_location(
                RejectionCode::InvalidXml,
                format!("Invalid value for attribute '{}': {}", name, err),
                format!("byte {}", position),
            )
        })?;
        check_chars(&value, position)?;

        let attribute = Attribute::new(name, value.into_owned());
        if attribute.name == "xmlns" || attribute.name.starts_with("xmlns:") {
            element.namespaces.push(attribute);
        } else {
            element.attributes.push(attribute);
        }
    }

    Ok(element)
}

/// XML 1.0 `Char`. Surrogates cannot occur in a Rust `char`.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | '_' | 'A'..='Z' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Reject characters that entered through character references.
fn check_chars(value: &str, position: u64) -> Result<(), Rejection> {
    match value.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(Rejection::with_location(
            RejectionCode::InvalidXml,
            format!("Character reference to U+{:04X} is not allowed in XML", c as u32),
            format!("byte {}", position),
        )),
        None => Ok(()),
    }
}

/// Element and attribute names must match the XML `Name` production.
fn check_name(name: &str, position: u64) -> Result<(), Rejection> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char);
    if valid {
        Ok(())
    } else {
        Err(Rejection::with_location(
            RejectionCode::InvalidXml,
            format!("Invalid XML name '{}'", name),
            format!("byte {}", position),
        ))
    }
}

/// Checks quick-xml leaves to the caller: attributes must be separated by
/// whitespace and quoted values must not contain a raw `<`.
fn check_attribute_layout(raw: &[u8], element: &str, position: u64) -> Result<(), Rejection> {
    let mut quote: Option<u8> = None;
    let mut after_value = false;

    for &b in raw {
        match quote {
            Some(q) if b == q => {
                quote = None;
                after_value = true;
            }
            Some(_) if b == b'<' => {
                return Err(Rejection::with_location(
                    RejectionCode::InvalidXml,
                    format!("Unescaped '<' in attribute value on <{}>", element),
                    format!("byte {}", position),
                ))
            }
            Some(_) => {}
            None => {
                if after_value && !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'/') {
                    return Err(Rejection::with_location(
                        RejectionCode::InvalidXml,
                        format!("Missing whitespace between attributes on <{}>", element),
                        format!("byte {}", position),
                    ));
                }
                after_value = false;
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                }
            }
        }
    }

    Ok(())
}
