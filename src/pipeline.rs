//! Render pipeline.
//!
//! The host renderer hands every rendered block to a [`Pipeline`], which
//! runs it through an ordered list of [`BlockFilter`]s. A filter only sees
//! blocks whose name it applies to, and passes its output on to the next.
//!
//! [`CoverBackgroundFilter`] is the filter this crate exists for: it reads
//! the two field identifiers from the block's attributes, resolves them,
//! and hands the URLs to the [`Injector`].

use crate::config::CoverConfig;
use crate::escape::SafeUrl;
use crate::inject::{BackgroundImages, Injector};
use crate::resolver::{FieldResolver, resolve_image_url};
use crate::scope::ScopeIdSource;
use crate::types::{BlockDescriptor, InjectionResult, RenderContext, SkipReason};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;

/// One stage of the render pipeline.
pub trait BlockFilter: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    fn applies_to(&self, block_name: &str) -> bool;

    /// Transform the fragment. Returning it borrowed means "unchanged".
    fn render<'a>(&self, ctx: &RenderContext<'a>) -> InjectionResult<'a>;
}

/// What rendering one block produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedBlock {
    pub html: String,
    /// Scope identifiers generated by the filters, in pipeline order.
    pub scope_ids: Vec<String>,
    /// Skip reasons reported by applicable filters that left the fragment
    /// as it was.
    pub skipped: Vec<SkipReason>,
    /// Number of filters that applied to the block.
    pub applied: usize,
    /// Whether any filter wrote a desktop background.
    pub desktop: bool,
}

impl RenderedBlock {
    pub fn changed(&self) -> bool {
        self.applied > self.skipped.len()
    }
}

/// Ordered filters, run in registration order.
#[derive(Default, Clone)]
pub struct Pipeline {
    filters: Vec<Arc<dyn BlockFilter>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl BlockFilter + 'static) -> Self {
        self.push(Arc::new(filter));
        self
    }

    pub fn push(&mut self, filter: Arc<dyn BlockFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The standard pipeline: one [`CoverBackgroundFilter`] set up from
    /// `config`.
    pub fn for_config(
        config: &CoverConfig,
        resolver: Arc<dyn FieldResolver>,
        ids: Arc<dyn ScopeIdSource>,
    ) -> Self {
        let injector = Injector::new(config.inject_options(), ids);
        Self::new().with_filter(CoverBackgroundFilter::new(
            config.block_options(),
            resolver,
            injector,
        ))
    }

    /// Render a block to its final HTML.
    pub fn render(&self, fragment: &str, block: &BlockDescriptor) -> String {
        self.render_block(fragment, block).html
    }

    /// Render a block and report what each filter did.
    pub fn render_block(&self, fragment: &str, block: &BlockDescriptor) -> RenderedBlock {
        let mut current: Option<String> = None;
        let mut scope_ids = Vec::new();
        let mut skipped = Vec::new();
        let mut applied = 0;
        let mut desktop = false;

        for filter in &self.filters {
            if !filter.applies_to(&block.block_name) {
                continue;
            }
            applied += 1;
            let input = current.as_deref().unwrap_or(fragment);
            let result = filter.render(&RenderContext::new(input, block));
            if let Some(id) = result.scope_id {
                scope_ids.push(id.to_string());
            }
            desktop |= result.desktop;
            if let Some(reason) = result.skipped {
                tracing::debug!(filter = filter.name(), block = %block.block_name, ?reason, "filter skipped block");
                skipped.push(reason);
            }
            let next = match result.html {
                Cow::Borrowed(_) => None,
                Cow::Owned(html) => Some(html),
            };
            if next.is_some() {
                current = next;
            }
        }

        RenderedBlock {
            html: current.unwrap_or_else(|| fragment.to_string()),
            scope_ids,
            skipped,
            applied,
            desktop,
        }
    }
}

/// Where the cover filter finds its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverBlockOptions {
    pub block_name: String,
    pub desktop_field_attribute: String,
    pub mobile_field_attribute: String,
}

impl Default for CoverBlockOptions {
    fn default() -> Self {
        Self {
            block_name: "core/cover".to_string(),
            desktop_field_attribute: "acfDesktopFieldKey".to_string(),
            mobile_field_attribute: "acfMobileFieldKey".to_string(),
        }
    }
}

/// Injects field-provided background images into cover blocks.
#[derive(Clone)]
pub struct CoverBackgroundFilter {
    options: CoverBlockOptions,
    resolver: Arc<dyn FieldResolver>,
    injector: Injector,
}

impl CoverBackgroundFilter {
    pub fn new(options: CoverBlockOptions, resolver: Arc<dyn FieldResolver>, injector: Injector) -> Self {
        Self {
            options,
            resolver,
            injector,
        }
    }

    fn resolve_field(&self, block: &BlockDescriptor, attribute: &str) -> Option<SafeUrl> {
        let field_id = block.attr_str(attribute)?;
        resolve_image_url(self.resolver.as_ref(), field_id)
    }
}

impl BlockFilter for CoverBackgroundFilter {
    fn name(&self) -> &str {
        "cover-background"
    }

    fn applies_to(&self, block_name: &str) -> bool {
        block_name == self.options.block_name
    }

    fn render<'a>(&self, ctx: &RenderContext<'a>) -> InjectionResult<'a> {
        let images = BackgroundImages::new(
            self.resolve_field(ctx.block, &self.options.desktop_field_attribute),
            self.resolve_field(ctx.block, &self.options.mobile_field_attribute),
        );
        self.injector.inject(ctx.fragment, &images)
    }
}
