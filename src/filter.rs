//! Allow-list tree filter.
//!
//! Walks the document pre-order. Disallowed elements are detached together
//! with their subtree, attributes go through deny-list, allow-list and value
//! scrubbing in that order, and CDATA sections are always removed.

use crate::parser::{Document, Element, Node};
use crate::policy::SanitizationPolicy;
use crate::scrub::AttributeScrubber;
use serde::Serialize;
use tracing::debug;

/// Why an attribute was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StripReason {
    /// On the deny-list or matching a denied pattern
    Denied,
    /// Not on the allow-list
    NotAllowed,
    /// Value rejected by the scrubber
    UnsafeValue,
}

/// One removed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrippedAttribute {
    pub element: String,
    pub attribute: String,
    pub reason: StripReason,
}

/// Everything a filter pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StripReport {
    /// Names of removed elements. Descendants of a removed element are not listed.
    pub elements: Vec<String>,
    pub attributes: Vec<StrippedAttribute>,
    pub cdata_sections: usize,
    pub comments: usize,
    pub processing_instructions: usize,
}

impl StripReport {
    /// True when the pass removed nothing.
    pub fn is_clean(&self) -> bool {
        self.elements.is_empty()
            && self.attributes.is_empty()
            && self.cdata_sections == 0
            && self.comments == 0
            && self.processing_instructions == 0
    }
}

/// Filter a document in place. Never fails; if the root itself is not
/// allowed the document is left without a root.
pub fn filter_document(
    doc: &mut Document,
    policy: &SanitizationPolicy,
    scrubber: &AttributeScrubber,
) -> StripReport {
    let mut report = StripReport::default();

    let keep_root = match doc.root.as_mut() {
        Some(root) => filter_element(root, policy, scrubber, &mut report),
        None => true,
    };
    if !keep_root {
        doc.root = None;
    }

    report
}

/// Returns `false` when the element must be detached from its parent.
fn filter_element(
    element: &mut Element,
    policy: &SanitizationPolicy,
    scrubber: &AttributeScrubber,
    report: &mut StripReport,
) -> bool {
    if !policy.is_element_allowed(&element.name) {
        debug!(element = %element.name, "Stripping disallowed element");
        report.elements.push(element.name.clone());
        return false;
    }

    let element_name = &element.name;
    element.attributes.retain_mut(|attr| {
        let reason = if policy.is_attribute_denied(&attr.name) {
            Some(StripReason::Denied)
        } else if !policy.is_attribute_allowed(&attr.name) {
            Some(StripReason::NotAllowed)
        } else {
            match scrubber.scrub(&attr.name, &attr.value) {
                Some(value) => {
                    attr.value = value;
                    None
                }
                None => Some(StripReason::UnsafeValue),
            }
        };

        match reason {
            None => true,
            Some(reason) => {
                debug!(
                    element = %element_name,
                    attribute = %attr.name,
                    reason = ?reason,
                    "Stripping attribute"
                );
                report.attributes.push(StrippedAttribute {
                    element: element_name.clone(),
                    attribute: attr.name.clone(),
                    reason,
                });
                false
            }
        }
    });

    element.children.retain_mut(|child| match child {
        Node::Element(child) => filter_element(child, policy, scrubber, report),
        Node::Text(_) => true,
        Node::CData(_) => {
            report.cdata_sections += 1;
            false
        }
        Node::Comment(_) => {
            if policy.keep_comments() {
                true
            } else {
                report.comments += 1;
                false
            }
        }
        Node::ProcessingInstruction(_) => {
            report.processing_instructions += 1;
            false
        }
    });

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_svg, ParseOptions};

    fn run(xml: &str, policy: &SanitizationPolicy) -> (Document, StripReport) {
        let mut doc = parse_svg(xml, &ParseOptions::default()).unwrap();
        let report = filter_document(&mut doc, policy, &AttributeScrubber::new());
        (doc, report)
    }

    #[test]
    fn test_disallowed_subtree_removed() {
        let (doc, report) = run(
            "<svg><script><rect/>alert(1)</script><rect width=\"1\"/></svg>",
            &SanitizationPolicy::strict(),
        );
        let root = doc.root().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.child_elements().next().unwrap().name, "rect");
        assert_eq!(report.elements, vec!["script".to_string()]);
    }

    #[test]
    fn test_siblings_after_removed_node_still_processed() {
        let (doc, report) = run(
            r#"<svg><foreignObject/><![CDATA[x]]><g onclick="x"/><iframe/><rect onload="y"/></svg>"#,
            &SanitizationPolicy::strict(),
        );
        let root = doc.root().unwrap();
        let names: Vec<&str> = root.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["g", "rect"]);
        assert!(root.child_elements().all(|e| e.attributes.is_empty()));
        assert_eq!(report.elements, vec!["foreignObject".to_string(), "iframe".to_string()]);
        assert_eq!(report.cdata_sections, 1);
        assert_eq!(report.attributes.len(), 2);
    }

    #[test]
    fn test_attribute_reasons() {
        let mut policy = SanitizationPolicy::strict();
        policy.add_denied_attribute("fill");
        let (doc, report) = run(
            r#"<svg><a href="javascript:x()" fill="red" data-x="1" stroke="blue"/></svg>"#,
            &policy,
        );
        let a = doc.root().unwrap().child_elements().next().unwrap();
        assert_eq!(a.attributes.len(), 1);
        assert_eq!(a.attribute("stroke"), Some("blue"));

        let reasons: Vec<(&str, StripReason)> = report
            .attributes
            .iter()
            .map(|s| (s.attribute.as_str(), s.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("href", StripReason::UnsafeValue),
                ("fill", StripReason::Denied),
                ("data-x", StripReason::NotAllowed),
            ]
        );
    }

    #[test]
    fn test_values_replaced_with_scrubbed_form() {
        let (doc, _) = run(r#"<svg width="  10  "/>"#, &SanitizationPolicy::strict());
        assert_eq!(doc.root().unwrap().attribute("width"), Some("10"));
    }

    #[test]
    fn test_namespace_declarations_preserved() {
        let (doc, report) = run(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"/>"#,
            &SanitizationPolicy::strict(),
        );
        assert_eq!(doc.root().unwrap().namespaces.len(), 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_comments_follow_policy() {
        let xml = "<svg><!-- keep? --><rect/></svg>";
        let (doc, report) = run(xml, &SanitizationPolicy::strict());
        assert_eq!(doc.root().unwrap().children.len(), 1);
        assert_eq!(report.comments, 1);

        let mut policy = SanitizationPolicy::strict();
        policy.set_keep_comments(true);
        let (doc, report) = run(xml, &policy);
        assert_eq!(doc.root().unwrap().children.len(), 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_root_removed_when_not_allowed() {
        let mut policy = SanitizationPolicy::strict();
        policy.remove_allowed_element("svg");
        let (doc, report) = run("<svg><rect/></svg>", &policy);
        assert!(doc.root().is_none());
        assert_eq!(report.elements, vec!["svg".to_string()]);
    }
}
