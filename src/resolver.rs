//! Field Resolver boundary.
//!
//! The injector never talks to a field provider directly. It asks a
//! [`FieldResolver`] for each field identifier and gets back an
//! [`ImageReference`], or nothing. Lookups that fail are logged and treated
//! as misses; they never abort a render.

use crate::escape::SafeUrl;
use crate::types::ImageReference;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field store must be a JSON object of field id to value")]
    NotAnObject,
    #[error("field provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a field identifier to an image value.
pub trait FieldResolver: Send + Sync {
    fn resolve(&self, field_id: &str) -> Result<Option<ImageReference>, ResolveError>;
}

/// Resolver used when no field provider is configured. Every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl FieldResolver for NullResolver {
    fn resolve(&self, _field_id: &str) -> Result<Option<ImageReference>, ResolveError> {
        Ok(None)
    }
}

/// Field values held in memory, typically loaded from a JSON file:
///
/// ```json
/// {
///   "field_hero_desktop": { "url": "https://x/hero.jpg", "alt": "Hero" },
///   "field_hero_mobile": "https://x/hero-portrait.jpg"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: BTreeMap<String, serde_json::Value>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ResolveError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            _ => Err(ResolveError::NotAnObject),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(field_id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldResolver for FieldStore {
    fn resolve(&self, field_id: &str) -> Result<Option<ImageReference>, ResolveError> {
        Ok(self
            .fields
            .get(field_id)
            .and_then(ImageReference::from_field_value))
    }
}

/// Resolve a field identifier all the way to an emit-ready URL.
///
/// Every way this can come up empty (unknown field, provider error, value
/// without a URL, disallowed scheme) is a miss, not an error. Rejected URLs
/// are logged at `warn` since they indicate unsafe data reaching the
/// renderer.
pub fn resolve_image_url(resolver: &dyn FieldResolver, field_id: &str) -> Option<SafeUrl> {
    let reference = match resolver.resolve(field_id) {
        Ok(Some(reference)) => reference,
        Ok(None) => {
            tracing::debug!(field_id, "field did not resolve");
            return None;
        }
        Err(e) => {
            tracing::warn!(field_id, error = %e, "field resolution failed");
            return None;
        }
    };
    let Some(url) = reference.url() else {
        tracing::debug!(field_id, "field value carries no URL");
        return None;
    };
    match SafeUrl::parse(url) {
        Ok(safe) => Some(safe),
        Err(rejection) => {
            tracing::warn!(field_id, %rejection, "refusing to emit image URL");
            None
        }
    }
}
