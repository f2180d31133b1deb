//! Markup Injector.
//!
//! Rewrites one rendered block fragment so it carries its background images.
//! Given a desktop and/or mobile URL, the first element of the target kind
//! receives:
//!
//! ```text
//! <style>@media screen and (min-width: 768px) { [data-carmo-bg-id="cb-…"] { background-size: cover; background-image: url(DESKTOP) !important; } }</style>
//! <div class="wp-block-cover …"
//!      style="… background-image: url(DESKTOP);"
//!      data-carmo-bg-id="cb-…"
//!      data-mobile-bg="MOBILE">
//! ```
//!
//! The inline style is the baseline that works with scripting disabled. The
//! scoped rule and the two data attributes only appear when a mobile image
//! exists and differs from the desktop one; the browser switcher reads
//! `data-mobile-bg` to swap images below the breakpoint.
//!
//! Nothing here fails. Missing images or a missing target element return the
//! input unchanged.

use crate::escape::{SafeUrl, attr_value, css_string};
use crate::markup::{Splice, StartTag, find_first};
use crate::scope::{ScopeId, ScopeIdSource};
use crate::switcher::BREAKPOINT_PX;
use crate::types::{InjectionResult, SkipReason};
use maud::{Markup, PreEscaped, html};
use std::borrow::Cow;
use std::sync::Arc;

/// Attribute carrying the mobile image for the browser switcher.
pub const MOBILE_ATTRIBUTE: &str = "data-mobile-bg";

/// Which element of a fragment receives the background.
///
/// Empty constraints match anything, so the default-constructed selector
/// picks the fragment's first element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelector {
    pub tag: Option<String>,
    pub class: Option<String>,
}

impl TargetSelector {
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            tag: None,
            class: Some(class.into()),
        }
    }

    pub fn matches(&self, tag: &StartTag<'_>) -> bool {
        self.tag.as_deref().is_none_or(|t| tag.is(t))
            && self.class.as_deref().is_none_or(|c| tag.has_class(c))
    }
}

/// Markup settings for the injector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectOptions {
    pub target: TargetSelector,
    /// Full name of the scope attribute, e.g. `data-carmo-bg-id`.
    pub scope_attribute: String,
    /// Value of `background-size` in the scoped rule.
    pub background_size: String,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            target: TargetSelector::class("wp-block-cover"),
            scope_attribute: "data-carmo-bg-id".to_string(),
            background_size: "cover".to_string(),
        }
    }
}

/// The resolved images for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundImages {
    pub desktop: Option<SafeUrl>,
    pub mobile: Option<SafeUrl>,
}

impl BackgroundImages {
    pub fn new(desktop: Option<SafeUrl>, mobile: Option<SafeUrl>) -> Self {
        Self { desktop, mobile }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }

    /// The mobile image, unless it repeats the desktop one.
    pub fn distinct_mobile(&self) -> Option<&SafeUrl> {
        self.mobile
            .as_ref()
            .filter(|m| self.desktop.as_ref() != Some(*m))
    }
}

/// Applies [`BackgroundImages`] to fragments.
#[derive(Clone)]
pub struct Injector {
    options: InjectOptions,
    ids: Arc<dyn ScopeIdSource>,
}

impl Injector {
    pub fn new(options: InjectOptions, ids: Arc<dyn ScopeIdSource>) -> Self {
        Self { options, ids }
    }

    pub fn options(&self) -> &InjectOptions {
        &self.options
    }

    /// Inject `images` into the first target element of `fragment`.
    pub fn inject<'a>(&self, fragment: &'a str, images: &BackgroundImages) -> InjectionResult<'a> {
        if images.is_empty() {
            tracing::debug!("no background images resolved, leaving fragment as is");
            return InjectionResult::unchanged(fragment, SkipReason::NoImages);
        }
        let Some(tag) = find_first(fragment, |t| self.options.target.matches(t)) else {
            tracing::debug!(selector = ?self.options.target, "no target element in fragment");
            return InjectionResult::unchanged(fragment, SkipReason::TargetNotFound);
        };

        let mut splice = Splice::new();
        if let Some(desktop) = &images.desktop {
            let declaration = attr_value(&background_declaration(desktop));
            splice.merge_attribute(&tag, "style", |existing| {
                merge_declarations(existing, &declaration)
            });
        }

        let mut scope_id = None;
        if let Some(mobile) = images.distinct_mobile() {
            let id = self.ids.next_id();
            splice.set_attribute(&tag, &self.options.scope_attribute, &attr_value(id.as_str()));
            splice.set_attribute(&tag, MOBILE_ATTRIBUTE, &attr_value(mobile.as_str()));
            if let Some(desktop) = &images.desktop {
                let rule = scoped_rule(
                    &self.options.scope_attribute,
                    &id,
                    desktop,
                    &self.options.background_size,
                );
                splice.insert_before(&tag, rule.into_string());
            }
            tracing::info!(scope_id = %id, element = tag.name(), "injected desktop and mobile backgrounds");
            scope_id = Some(id);
        } else {
            tracing::info!(element = tag.name(), "injected desktop background");
        }

        InjectionResult {
            html: Cow::Owned(splice.apply(fragment)),
            scope_id,
            desktop: images.desktop.is_some(),
            skipped: None,
        }
    }
}

/// `background-image: url(URL);`
fn background_declaration(url: &SafeUrl) -> String {
    format!("background-image: url({url});")
}

/// Append `declaration` to an existing (raw) style value, space separated.
///
/// A `;` is added when the existing text doesn't end with one, so the
/// declaration list stays valid.
fn merge_declarations(existing: &str, declaration: &str) -> String {
    let existing = existing.trim_end();
    if existing.trim().is_empty() {
        declaration.to_string()
    } else if existing.ends_with(';') {
        format!("{existing} {declaration}")
    } else {
        format!("{existing}; {declaration}")
    }
}

/// The scoped rule pinning the desktop image at and above the breakpoint.
fn scoped_rule(attribute: &str, id: &ScopeId, desktop: &SafeUrl, size: &str) -> Markup {
    let css = format!(
        "@media screen and (min-width: {BREAKPOINT_PX}px) {{ [{attribute}=\"{id}\"] {{ background-size: {size}; background-image: url({desktop}) !important; }} }}",
        id = css_string(id.as_str()),
    );
    html! {
        style { (PreEscaped(css)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{FixedScopeId, RandomScopeIds};

    const COVER: &str = r#"<div class="wp-block-cover" style="color:red;"><span class="wp-block-cover__background"></span><div class="wp-block-cover__inner-container"><p>Hello</p></div></div>"#;

    fn url(s: &str) -> Option<SafeUrl> {
        Some(SafeUrl::parse(s).unwrap())
    }

    fn injector(id: &str) -> Injector {
        Injector::new(
            InjectOptions::default(),
            Arc::new(FixedScopeId(ScopeId::new(id))),
        )
    }

    #[test]
    fn no_images_is_byte_identical_noop() {
        let result = injector("x").inject(COVER, &BackgroundImages::default());
        assert!(result.is_unchanged());
        assert_eq!(result.html, COVER);
        assert_eq!(result.skipped, Some(SkipReason::NoImages));
    }

    #[test]
    fn noop_does_not_need_valid_markup() {
        let broken = "<div class=\"wp-block-cover";
        let result = injector("x").inject(broken, &BackgroundImages::default());
        assert_eq!(result.html, broken);
    }

    #[test]
    fn missing_target_returns_input() {
        let html = r#"<div class="wp-block-group"><p>no cover</p></div>"#;
        let images = BackgroundImages::new(url("http://x/a.png"), url("http://x/b.png"));
        let result = injector("x").inject(html, &images);
        assert!(result.is_unchanged());
        assert_eq!(result.html, html);
        assert_eq!(result.skipped, Some(SkipReason::TargetNotFound));
        assert!(result.scope_id.is_none());
    }

    #[test]
    fn style_merge_preserves_existing_declarations() {
        let images = BackgroundImages::new(url("http://x/a.png"), None);
        let result = injector("x").inject(COVER, &images);
        assert!(result.html.contains("color:red;"));
        assert!(result.html.contains("background-image: url(http://x/a.png);"));
        assert!(
            result
                .html
                .starts_with(r#"<div class="wp-block-cover" style="color:red; background-image: url(http://x/a.png);">"#)
        );
    }

    #[test]
    fn desktop_only_emits_no_scope() {
        let images = BackgroundImages::new(url("http://x/a.png"), None);
        let result = injector("x").inject(COVER, &images);
        assert!(result.desktop);
        assert!(result.scope_id.is_none());
        assert!(!result.html.contains("<style>"));
        assert!(!result.html.contains(MOBILE_ATTRIBUTE));
        assert!(!result.html.contains("data-carmo-bg-id"));
    }

    #[test]
    fn missing_semicolon_is_added_before_merge() {
        let html = r#"<div class="wp-block-cover" style="min-height:50vh">"#;
        let images = BackgroundImages::new(url("/a.png"), None);
        let result = injector("x").inject(html, &images);
        assert_eq!(
            result.html,
            r#"<div class="wp-block-cover" style="min-height:50vh; background-image: url(/a.png);">"#
        );
    }

    #[test]
    fn style_attribute_created_when_missing() {
        let html = r#"<div class="wp-block-cover"></div>"#;
        let images = BackgroundImages::new(url("/a.png"), None);
        let result = injector("x").inject(html, &images);
        assert_eq!(
            result.html,
            r#"<div class="wp-block-cover" style="background-image: url(/a.png);"></div>"#
        );
    }

    #[test]
    fn distinct_mobile_emits_scoped_rule() {
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let result = injector("cb-1").inject(COVER, &images);
        let expected_style = r#"<style>@media screen and (min-width: 768px) { [data-carmo-bg-id="cb-1"] { background-size: cover; background-image: url(a.png) !important; } }</style>"#;
        assert!(result.html.starts_with(expected_style));
        assert!(result.html[expected_style.len()..].starts_with("<div class=\"wp-block-cover\""));
        assert!(result.html.contains(r#"data-carmo-bg-id="cb-1""#));
        assert!(result.html.contains(r#"data-mobile-bg="b.png""#));
        assert_eq!(result.scope_id, Some(ScopeId::new("cb-1")));
    }

    #[test]
    fn generated_id_used_consistently() {
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let result = Injector::new(InjectOptions::default(), Arc::new(RandomScopeIds))
            .inject(COVER, &images);
        let id = result.scope_id.expect("scope id");
        assert_eq!(result.html.matches(id.as_str()).count(), 2);
        assert_eq!(result.html.matches("data-carmo-bg-id=").count(), 2);
        assert!(result.html.contains(&format!(r#"[data-carmo-bg-id="{id}"]"#)));
        assert!(result.html.contains(&format!(r#"data-carmo-bg-id="{id}""#)));
        assert!(result.html.contains("min-width: 768px"));
    }

    #[test]
    fn equal_images_suppress_mobile_path() {
        let images = BackgroundImages::new(url("http://x/a.png"), url("http://x/a.png"));
        let result = injector("x").inject(COVER, &images);
        assert!(result.scope_id.is_none());
        assert!(!result.html.contains("<style>"));
        assert!(!result.html.contains("data-carmo-bg-id"));
        assert!(!result.html.contains(MOBILE_ATTRIBUTE));
        assert!(result.html.contains("background-image: url(http://x/a.png);"));
    }

    #[test]
    fn mobile_only_marks_element_without_rule() {
        let images = BackgroundImages::new(None, url("b.png"));
        let result = injector("m").inject(COVER, &images);
        assert!(!result.desktop);
        assert!(!result.html.contains("<style>"));
        assert!(!result.html.contains("background-image"));
        assert!(result.html.contains(r#"data-mobile-bg="b.png""#));
        assert!(result.html.contains(r#"data-carmo-bg-id="m""#));
    }

    #[test]
    fn same_id_gives_identical_output() {
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let a = injector("same").inject(COVER, &images);
        let b = injector("same").inject(COVER, &images);
        assert_eq!(a.html, b.html);
    }

    #[test]
    fn two_renders_get_distinct_ids() {
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let injector = Injector::new(InjectOptions::default(), Arc::new(RandomScopeIds));
        let first = injector.inject(COVER, &images).scope_id.unwrap();
        let second = injector.inject(COVER, &images).scope_id.unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn only_first_target_is_mutated() {
        let html = r#"<div class="wp-block-cover" id="one"></div><div class="wp-block-cover" id="two"></div>"#;
        let images = BackgroundImages::new(url("a.png"), None);
        let result = injector("x").inject(html, &images);
        assert_eq!(result.html.matches("background-image").count(), 1);
        assert!(result.html.contains(r#"id="one" style="#));
    }

    #[test]
    fn target_skips_non_matching_leading_elements() {
        let html = r#"<section><div class="is-style-x wp-block-cover"></div></section>"#;
        let images = BackgroundImages::new(url("a.png"), None);
        let result = injector("x").inject(html, &images);
        assert_eq!(
            result.html,
            r#"<section><div class="is-style-x wp-block-cover" style="background-image: url(a.png);"></div></section>"#
        );
    }

    #[test]
    fn class_inside_script_is_not_a_target() {
        let html = r#"<script>document.write('<div class="wp-block-cover">')</script><p>x</p>"#;
        let images = BackgroundImages::new(url("a.png"), None);
        assert!(injector("x").inject(html, &images).is_unchanged());
    }

    #[test]
    fn existing_mobile_attribute_is_replaced() {
        let html = r#"<div class="wp-block-cover" data-mobile-bg="old.png">"#;
        let images = BackgroundImages::new(url("a.png"), url("new.png"));
        let result = injector("x").inject(html, &images);
        assert_eq!(result.html.matches(MOBILE_ATTRIBUTE).count(), 1);
        assert!(result.html.contains(r#"data-mobile-bg="new.png""#));
    }

    #[test]
    fn bare_trailing_mobile_attribute_gets_its_value() {
        let html = r#"<div class="wp-block-cover" data-mobile-bg></div>"#;
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let result = injector("x").inject(html, &images);
        assert!(result.html.ends_with(
            r#"<div class="wp-block-cover" data-mobile-bg="b.png" style="background-image: url(a.png);" data-carmo-bg-id="x"></div>"#
        ));
        let tag = find_first(&result.html, |t| t.has_class("wp-block-cover")).unwrap();
        assert_eq!(tag.raw_value(MOBILE_ATTRIBUTE), Some("b.png"));
        assert_eq!(tag.raw_value("data-carmo-bg-id"), Some("x"));
    }

    #[test]
    fn bare_trailing_scope_attribute_gets_its_value() {
        let html = r#"<div class="wp-block-cover" data-carmo-bg-id></div>"#;
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let result = injector("x").inject(html, &images);
        let tag = find_first(&result.html, |t| t.has_class("wp-block-cover")).unwrap();
        assert_eq!(tag.raw_value("data-carmo-bg-id"), Some("x"));
        assert_eq!(tag.raw_value(MOBILE_ATTRIBUTE), Some("b.png"));
        assert_eq!(tag.raw_value("style"), Some("background-image: url(a.png);"));
    }

    #[test]
    fn scope_attribute_colliding_with_mobile_attribute_does_not_panic() {
        let options = InjectOptions {
            scope_attribute: MOBILE_ATTRIBUTE.to_string(),
            ..InjectOptions::default()
        };
        let injector = Injector::new(options, Arc::new(FixedScopeId(ScopeId::new("x"))));
        let html = r#"<div class="wp-block-cover" data-mobile-bg="old.png"></div>"#;
        let result = injector.inject(html, &BackgroundImages::new(url("a.png"), url("b.png")));
        let tag = find_first(&result.html, |t| t.has_class("wp-block-cover")).unwrap();
        assert_eq!(tag.raw_value(MOBILE_ATTRIBUTE), Some("x"));
    }

    #[test]
    fn single_quoted_style_keeps_quotes() {
        let html = r#"<div class='wp-block-cover' style='color:red'>"#;
        let images = BackgroundImages::new(url("a.png"), None);
        let result = injector("x").inject(html, &images);
        assert_eq!(
            result.html,
            r#"<div class='wp-block-cover' style='color:red; background-image: url(a.png);'>"#
        );
    }

    #[test]
    fn ampersand_escaped_in_attribute_but_not_in_style_block() {
        let images = BackgroundImages::new(url("/a.png?w=1&h=2"), url("/b.png?w=1&h=2"));
        let result = injector("x").inject(COVER, &images);
        assert!(result.html.contains("url(/a.png?w=1&h=2) !important"));
        assert!(result.html.contains("background-image: url(/a.png?w=1&amp;h=2);"));
        assert!(result.html.contains(r#"data-mobile-bg="/b.png?w=1&amp;h=2""#));
    }

    #[test]
    fn hostile_scope_id_is_escaped_per_context() {
        let images = BackgroundImages::new(url("a.png"), url("b.png"));
        let result = injector("\"></style><script>x</script>").inject(COVER, &images);
        assert!(!result.html.contains("<script>"));
        assert_eq!(result.html.matches("</style>").count(), 1);
    }

    #[test]
    fn tag_constraint_narrows_target() {
        let options = InjectOptions {
            target: TargetSelector {
                tag: Some("section".into()),
                class: None,
            },
            ..InjectOptions::default()
        };
        let injector = Injector::new(options, Arc::new(FixedScopeId(ScopeId::new("x"))));
        let html = r#"<div></div><SECTION class="hero"></SECTION>"#;
        let result = injector.inject(html, &BackgroundImages::new(url("a.png"), None));
        assert!(result.html.contains(r#"<SECTION class="hero" style="background-image: url(a.png);">"#));
    }

    #[test]
    fn merge_declarations_cases() {
        assert_eq!(merge_declarations("", "b:1;"), "b:1;");
        assert_eq!(merge_declarations("   ", "b:1;"), "b:1;");
        assert_eq!(merge_declarations("a:1;", "b:1;"), "a:1; b:1;");
        assert_eq!(merge_declarations("a:1; ", "b:1;"), "a:1; b:1;");
        assert_eq!(merge_declarations("a:1", "b:1;"), "a:1; b:1;");
    }
}
