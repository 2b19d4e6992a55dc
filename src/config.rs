//! Configuration types for the SVG sanitizer.

use crate::policy::DEFAULT_DENIED_PATTERNS;
use serde::{Deserialize, Serialize};

/// Main configuration for the SVG sanitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgSanitizerConfig {
    /// Config version
    pub version: String,

    /// General settings
    pub settings: SettingsConfig,

    /// Element/attribute policy
    pub policy: PolicyConfig,

    /// XXE prevention configuration
    pub xxe_prevention: XxePreventionConfig,

    /// Attribute value scrubbing
    pub scrubbing: ScrubbingConfig,
}

impl Default for SvgSanitizerConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: SettingsConfig::default(),
            policy: PolicyConfig::default(),
            xxe_prevention: XxePreventionConfig::default(),
            scrubbing: ScrubbingConfig::default(),
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Maximum input size to process (bytes)
    pub max_input_size: usize,

    /// Maximum element nesting depth
    pub max_depth: usize,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            max_input_size: 1_048_576, // 1MB
            max_depth: 256,
        }
    }
}

/// Built-in policy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyProfile {
    /// Static graphics only: no script, foreignObject or animation
    #[default]
    Strict,
    /// The historical table, including script and animation elements
    Legacy,
}

/// Overrides applied on top of the selected profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Base table
    pub profile: PolicyProfile,

    /// Extra elements to allow
    pub allow_elements: Vec<String>,

    /// Elements to drop from the allow-list
    pub remove_elements: Vec<String>,

    /// Extra attributes to allow
    pub allow_attributes: Vec<String>,

    /// Attributes to drop from the allow-list
    pub remove_attributes: Vec<String>,

    /// Extra attributes to deny
    pub deny_attributes: Vec<String>,

    /// Attributes to drop from the deny-list
    pub undeny_attributes: Vec<String>,

    /// Glob patterns; matching attribute names are denied
    pub deny_attribute_patterns: Vec<String>,

    /// Keep XML comments in the output
    pub keep_comments: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            profile: PolicyProfile::Strict,
            allow_elements: Vec::new(),
            remove_elements: Vec::new(),
            allow_attributes: Vec::new(),
            remove_attributes: Vec::new(),
            deny_attributes: Vec::new(),
            undeny_attributes: Vec::new(),
            deny_attribute_patterns: DEFAULT_DENIED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            keep_comments: false,
        }
    }
}

/// XXE (XML External Entity) prevention configuration.
///
/// Entities are never expanded and DTDs never loaded, whatever these flags
/// say; the flags only decide whether such markup is refused or dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XxePreventionConfig {
    /// Reject documents with a DOCTYPE declaration (otherwise it is dropped)
    pub block_doctype: bool,

    /// Reject documents with processing instructions (otherwise stripped)
    pub block_processing_instructions: bool,
}

impl Default for XxePreventionConfig {
    fn default() -> Self {
        Self {
            block_doctype: true,
            block_processing_instructions: false,
        }
    }
}

/// Attribute value scrubbing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScrubbingConfig {
    /// Exact historical checks: case-sensitive `style` match, no decoding
    pub legacy_matching: bool,

    /// When non-empty, `href`/`xlink:href` schemes must be in this list
    pub allowed_href_schemes: Vec<String>,
}
