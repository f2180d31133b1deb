//! Value types passed across the render boundary.
//!
//! Everything here is created per render and dropped afterwards; nothing is
//! shared between renders.

use crate::scope::ScopeId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A resolved image field value.
///
/// The field provider returns either a bare URL or a structured image
/// descriptor. Both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageReference {
    Url(String),
    Descriptor(ImageDescriptor),
}

/// Structured image value as returned by the field provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl ImageReference {
    /// Interpret a raw field value. Strings become [`ImageReference::Url`],
    /// objects [`ImageReference::Descriptor`]; anything else is `None`.
    pub fn from_field_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(ImageReference::Url(s.clone())),
            serde_json::Value::Object(map) => {
                // Field by field, so one oddly typed member (a numeric
                // string width, say) doesn't lose the URL.
                let text = |key: &str| map.get(key).and_then(|v| v.as_str()).map(str::to_string);
                let number = |key: &str| map.get(key).and_then(|v| v.as_u64());
                Some(ImageReference::Descriptor(ImageDescriptor {
                    url: text("url"),
                    alt: text("alt"),
                    width: number("width").and_then(|n| u32::try_from(n).ok()),
                    height: number("height").and_then(|n| u32::try_from(n).ok()),
                    id: number("id"),
                }))
            }
            _ => None,
        }
    }

    /// The URL carried by this reference, if non-empty.
    pub fn url(&self) -> Option<&str> {
        let url = match self {
            ImageReference::Url(u) => u.as_str(),
            ImageReference::Descriptor(d) => d.url.as_deref()?,
        };
        (!url.trim().is_empty()).then_some(url)
    }
}

/// The parsed block handed over by the host renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    #[serde(rename = "blockName", default)]
    pub block_name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl BlockDescriptor {
    pub fn new(block_name: impl Into<String>) -> Self {
        Self {
            block_name: block_name.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Builder-style string attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// A string attribute, treating non-strings and blank strings as absent.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// One render's input: the fragment and the block it was rendered from.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub fragment: &'a str,
    pub block: &'a BlockDescriptor,
}

impl<'a> RenderContext<'a> {
    pub fn new(fragment: &'a str, block: &'a BlockDescriptor) -> Self {
        Self { fragment, block }
    }
}

/// Why a render left its fragment untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither image resolved.
    NoImages,
    /// The fragment has no element of the target kind.
    TargetNotFound,
}

/// The fragment after injection.
///
/// `html` borrows the input when nothing changed, so a skipped render is
/// byte-identical to its input by construction.
#[derive(Debug, Clone)]
pub struct InjectionResult<'a> {
    pub html: Cow<'a, str>,
    /// Identifier scoping the out-of-band style rule, when one was needed.
    pub scope_id: Option<ScopeId>,
    /// Whether a desktop image went into the inline style.
    pub desktop: bool,
    pub skipped: Option<SkipReason>,
}

impl<'a> InjectionResult<'a> {
    pub fn unchanged(fragment: &'a str, reason: SkipReason) -> Self {
        Self {
            html: Cow::Borrowed(fragment),
            scope_id: None,
            desktop: false,
            skipped: Some(reason),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self.html, Cow::Borrowed(_))
    }
}
