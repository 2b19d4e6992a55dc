//! Element and attribute allow/deny policy.
//!
//! A policy is built once at startup from a profile table plus configuration
//! overrides and then handed to the sanitizer by value. The add/remove
//! operations take `&mut self`, so a policy cannot change underneath a
//! sanitization pass that borrows it.

use crate::config::{PolicyConfig, PolicyProfile};
use crate::error::GuardError;
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::collections::HashSet;

/// Elements present in every profile.
const STATIC_ELEMENTS: &[&str] = &[
    "svg", "g", "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
    "text", "tspan", "title", "desc", "defs", "use", "symbol", "mask", "clipPath",
    "linearGradient", "radialGradient", "stop", "filter", "feGaussianBlur",
    "feColorMatrix", "feComponentTransfer", "feComposite", "feConvolveMatrix",
    "feDiffuseLighting", "feDisplacementMap", "feFlood", "feImage", "feMerge",
    "feMorphology", "feOffset", "feSpecularLighting", "feTile", "feTurbulence",
    "feDistantLight", "fePointLight", "feSpotLight", "feFuncR", "feFuncG",
    "feFuncB", "feFuncA", "metadata", "switch", "a", "image", "marker",
    "pattern", "style", "view", "font", "font-face", "font-face-uri",
    "font-face-format", "font-face-name", "missing-glyph", "glyph", "hkern",
    "vkern", "font-face-src",
];

/// Script, embedded content and animation. Only the legacy profile allows these.
const ACTIVE_ELEMENTS: &[&str] = &[
    "animate", "animateTransform", "animateMotion", "set", "foreignObject", "script",
];

const ALLOWED_ATTRIBUTES: &[&str] = &[
    // Core
    "id", "class", "style", "title", "lang", "xml:lang", "xml:space",
    // Geometry and presentation
    "width", "height", "viewBox", "preserveAspectRatio", "x", "y",
    "cx", "cy", "r", "rx", "ry", "d", "points", "x1", "y1", "x2", "y2",
    "transform", "fill", "fill-opacity", "fill-rule", "stroke", "stroke-width",
    "stroke-opacity", "stroke-linecap", "stroke-linejoin", "stroke-miterlimit",
    "stroke-dasharray", "stroke-dashoffset", "opacity", "visibility", "display",
    "clip-path", "mask", "filter", "font-family", "font-size", "font-weight",
    "font-style", "text-anchor", "dominant-baseline", "letter-spacing",
    "word-spacing", "text-decoration", "writing-mode", "direction",
    // Animation timing
    "begin", "dur", "end", "repeatCount", "repeatDur", "calcMode",
    "values", "keyTimes", "keySplines", "from", "to", "by", "attributeName",
    "attributeType", "additive", "accumulate", "restart", "min", "max",
    // Filters
    "stdDeviation", "order", "kernelMatrix", "divisor", "bias", "targetX",
    "targetY", "edgeMode", "preserveAlpha", "xChannelSelector", "yChannelSelector",
    "in", "in2", "operator", "k1", "k2", "k3", "k4", "type", "tableValues",
    "slope", "intercept", "amplitude", "exponent", "frequency", "phase",
    "baseFrequency", "numOctaves", "seed", "stitchTiles", "scale",
    // Gradients, patterns, clipping
    "gradientUnits", "gradientTransform", "spreadMethod", "offset",
    "stop-color", "stop-opacity", "patternUnits", "patternContentUnits",
    "patternTransform", "clipPathUnits", "maskUnits", "maskContentUnits",
    // Text
    "dx", "dy", "rotate", "lengthAdjust", "textLength",
    // Links and images
    "href", "xlink:href", "crossorigin",
    // Conditional processing
    "requiredExtensions", "requiredFeatures", "systemLanguage",
    // Motion
    "path", "keyPoints", "origin",
    // Fonts
    "font-variant", "font-stretch", "font-size-adjust", "kerning", "unicode-bidi",
    "alignment-baseline", "baseline-shift", "glyph-orientation-horizontal",
    "glyph-orientation-vertical", "text-rendering", "font-variant-ligatures",
    "font-variant-position", "font-variant-caps", "font-variant-numeric",
    "font-variant-alternates", "font-feature-settings", "font-variation-settings",
    "font-language-override", "font-kerning", "font-synthesis", "font-smooth",
    "font-display", "font-src", "font-format", "font-named-instance",
    "font-variant-east-asian",
];

const DENIED_ATTRIBUTES: &[&str] = &[
    "onload", "onerror", "onclick", "onmouseover", "onmouseout", "onmousedown",
    "onmouseup", "onmousemove", "onkeydown", "onkeyup", "onkeypress", "onfocus",
    "onblur", "onchange", "onsubmit", "onreset", "onselect", "onunload",
    "onabort", "onbeforeunload", "onhashchange", "onmessage",
    "onoffline", "ononline", "onpagehide", "onpageshow", "onpopstate",
    "onresize", "onstorage", "oncontextmenu", "oninput", "oninvalid",
    "onsearch", "onbeforeprint", "onafterprint", "onbeforeinstallprompt",
    "onappinstalled",
];

/// Attribute-name globs denied unless configuration says otherwise.
pub const DEFAULT_DENIED_PATTERNS: &[&str] = &["on*"];

const PATTERN_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Allow/deny lists consulted by the tree filter.
#[derive(Debug, Clone)]
pub struct SanitizationPolicy {
    allowed_elements: HashSet<String>,
    allowed_attributes: HashSet<String>,
    denied_attributes: HashSet<String>,
    denied_patterns: Vec<Pattern>,
    keep_comments: bool,
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl SanitizationPolicy {
    /// Static graphics only.
    pub fn strict() -> Self {
        Self::from_tables(STATIC_ELEMENTS.iter())
    }

    /// The historical table, including `script`, `foreignObject` and animation.
    pub fn legacy() -> Self {
        Self::from_tables(STATIC_ELEMENTS.iter().chain(ACTIVE_ELEMENTS))
    }

    /// Built-in table for a profile.
    pub fn for_profile(profile: PolicyProfile) -> Self {
        match profile {
            PolicyProfile::Strict => Self::strict(),
            PolicyProfile::Legacy => Self::legacy(),
        }
    }

    fn from_tables<'a>(elements: impl Iterator<Item = &'a &'static str>) -> Self {
        Self {
            allowed_elements: elements.map(|e| e.to_string()).collect(),
            allowed_attributes: ALLOWED_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            denied_attributes: DENIED_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            denied_patterns: DEFAULT_DENIED_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            keep_comments: false,
        }
    }

    /// Build a policy from configuration: profile table, then removals, then additions.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, GuardError> {
        let mut policy = Self::for_profile(config.profile);

        for element in &config.remove_elements {
            policy.remove_allowed_element(element);
        }
        for element in &config.allow_elements {
            policy.add_allowed_element(element);
        }
        for attribute in &config.remove_attributes {
            policy.remove_allowed_attribute(attribute);
        }
        for attribute in &config.allow_attributes {
            policy.add_allowed_attribute(attribute);
        }
        for attribute in &config.undeny_attributes {
            policy.remove_denied_attribute(attribute);
        }
        for attribute in &config.deny_attributes {
            policy.add_denied_attribute(attribute);
        }
        policy.denied_patterns.clear();
        for pattern in &config.deny_attribute_patterns {
            policy.add_denied_pattern(pattern)?;
        }
        policy.keep_comments = config.keep_comments;

        Ok(policy)
    }

    /// Whether an element with this qualified name survives filtering.
    pub fn is_element_allowed(&self, name: &str) -> bool {
        self.allowed_elements.contains(name)
    }

    /// Whether an attribute name is on the allow-list.
    pub fn is_attribute_allowed(&self, name: &str) -> bool {
        self.allowed_attributes.contains(name)
    }

    /// Whether an attribute name is denied, by name or by pattern.
    pub fn is_attribute_denied(&self, name: &str) -> bool {
        self.denied_attributes.contains(name)
            || self
                .denied_patterns
                .iter()
                .any(|p| p.matches_with(name, PATTERN_OPTIONS))
    }

    pub fn keep_comments(&self) -> bool {
        self.keep_comments
    }

    pub fn set_keep_comments(&mut self, keep: bool) {
        self.keep_comments = keep;
    }

    // Administrative surface. Each returns whether the set changed.

    pub fn add_allowed_element(&mut self, name: &str) -> bool {
        self.allowed_elements.insert(name.to_string())
    }

    pub fn remove_allowed_element(&mut self, name: &str) -> bool {
        self.allowed_elements.remove(name)
    }

    pub fn add_allowed_attribute(&mut self, name: &str) -> bool {
        self.allowed_attributes.insert(name.to_string())
    }

    pub fn remove_allowed_attribute(&mut self, name: &str) -> bool {
        self.allowed_attributes.remove(name)
    }

    pub fn add_denied_attribute(&mut self, name: &str) -> bool {
        self.denied_attributes.insert(name.to_string())
    }

    pub fn remove_denied_attribute(&mut self, name: &str) -> bool {
        self.denied_attributes.remove(name)
    }

    /// Deny every attribute whose name matches a glob pattern (case-insensitive).
    pub fn add_denied_pattern(&mut self, pattern: &str) -> Result<bool, GuardError> {
        if self.denied_patterns.iter().any(|p| p.as_str() == pattern) {
            return Ok(false);
        }
        let compiled = Pattern::new(pattern).map_err(|e| {
            GuardError::Config(format!("Invalid attribute pattern '{}': {}", pattern, e))
        })?;
        self.denied_patterns.push(compiled);
        Ok(true)
    }

    pub fn remove_denied_pattern(&mut self, pattern: &str) -> bool {
        let before = self.denied_patterns.len();
        self.denied_patterns.retain(|p| p.as_str() != pattern);
        self.denied_patterns.len() != before
    }

    /// Allowed element names, sorted.
    pub fn allowed_elements(&self) -> Vec<&str> {
        sorted(&self.allowed_elements)
    }

    /// Allowed attribute names, sorted.
    pub fn allowed_attributes(&self) -> Vec<&str> {
        sorted(&self.allowed_attributes)
    }

    /// Denied attribute names, sorted.
    pub fn denied_attributes(&self) -> Vec<&str> {
        sorted(&self.denied_attributes)
    }

    /// Denied attribute patterns in insertion order.
    pub fn denied_patterns(&self) -> Vec<&str> {
        self.denied_patterns.iter().map(|p| p.as_str()).collect()
    }

    /// Serializable view of the policy.
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            allowed_elements: self.allowed_elements().into_iter().map(String::from).collect(),
            allowed_attributes: self.allowed_attributes().into_iter().map(String::from).collect(),
            denied_attributes: self.denied_attributes().into_iter().map(String::from).collect(),
            denied_attribute_patterns: self.denied_patterns().into_iter().map(String::from).collect(),
            keep_comments: self.keep_comments,
        }
    }
}

fn sorted(set: &HashSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = set.iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Effective policy as printed by `--print-policy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    pub allowed_elements: Vec<String>,
    pub allowed_attributes: Vec<String>,
    pub denied_attributes: Vec<String>,
    pub denied_attribute_patterns: Vec<String>,
    pub keep_comments: bool,
}
