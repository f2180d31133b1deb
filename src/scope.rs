//! Per-render scope identifiers.
//!
//! A scope identifier binds a mutated element to the `<style>` rule emitted
//! next to it. Every render that needs one draws a fresh identifier, so two
//! copies of the same block on one page never share a rule.

use std::fmt;
use uuid::Uuid;

/// Prefix of generated identifiers. Keeps them valid as CSS idents and
/// recognizable in page source.
const ID_PREFIX: &str = "cb-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(String);

impl ScopeId {
    /// Wrap an arbitrary identifier. No validation: emitters escape it for
    /// each output context.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of scope identifiers. Shared across threads by the batch renderer.
pub trait ScopeIdSource: Send + Sync {
    fn next_id(&self) -> ScopeId;
}

/// Random identifiers from UUID v4. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomScopeIds;

impl ScopeIdSource for RandomScopeIds {
    fn next_id(&self) -> ScopeId {
        ScopeId(format!("{ID_PREFIX}{}", Uuid::new_v4().simple()))
    }
}

/// Always returns the same identifier, for reproducible output.
#[derive(Debug, Clone)]
pub struct FixedScopeId(pub ScopeId);

impl ScopeIdSource for FixedScopeId {
    fn next_id(&self) -> ScopeId {
        self.0.clone()
    }
}
