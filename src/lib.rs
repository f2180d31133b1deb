//! # Carmo Cover
//!
//! Separate desktop and mobile background images for cover blocks.
//!
//! An author picks two images for a cover block; the block's attributes hold
//! two field identifiers. At render time the identifiers are resolved to
//! URLs and the block's markup is rewritten so its outer element carries the
//! desktop image inline. When a distinct mobile image exists the element
//! also gets a scope attribute, a scoped `<style>` rule and
//! `data-mobile-bg`. In the browser a small switcher swaps to the mobile
//! image below 768px and puts the original back above it.
//!
//! # Architecture: Two Runtimes, One Contract
//!
//! ```text
//! render time                                   client time
//! ───────────                                   ───────────
//! block attrs ─▶ resolver ─▶ 0-2 URLs           data-mobile-bg ─▶ switcher
//!                               │                      ▲
//! fragment ───────────────────▶ injector ─▶ HTML ──────┘
//! ```
//!
//! The two halves share nothing but the generated markup: the
//! `data-mobile-bg` attribute and the 768px breakpoint.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | `BlockFilter` trait, ordered `Pipeline`, and the cover background filter |
//! | [`inject`] | Rewrites one fragment: style merge, scope attribute, scoped rule |
//! | [`markup`] | Linear start-tag scanner and byte-range splicing |
//! | [`escape`] | `SafeUrl` sanitization and attribute/CSS escaping |
//! | [`resolver`] | Field Resolver boundary: `FieldResolver`, `FieldStore`, `NullResolver` |
//! | [`scope`] | Per-render scope identifiers behind `ScopeIdSource` |
//! | [`switcher`] | Breakpoint state machine, in-memory DOM host, embedded browser script |
//! | [`types`] | Values crossing the render boundary |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`batch`] | Parallel rendering of a block directory |
//! | [`preview`] | Standalone preview page with the switcher embedded |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Splicing, Not Re-serializing
//!
//! Fragments come from a host renderer and may contain markup no parser
//! would round-trip byte for byte. The injector finds the target start tag
//! with a forward scan and edits only the bytes it must, so everything else
//! in the fragment survives untouched and a skipped render returns the input
//! borrowed.
//!
//! ## Only `SafeUrl` Reaches Output
//!
//! Image URLs come from author-controlled fields. They are parsed into
//! [`escape::SafeUrl`] before the injector sees them; anything with a scheme
//! other than `http` or `https`, or that can't be made safe for an unquoted
//! CSS `url()`, is dropped with a warning.
//!
//! ## Capture Once
//!
//! The switcher records each element's original background the first time it
//! sees it and keeps that value for the element's lifetime. Activating again
//! for newly inserted content can't overwrite it with a mobile image that is
//! currently applied.

pub mod batch;
pub mod config;
pub mod escape;
pub mod inject;
pub mod logging;
pub mod markup;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod resolver;
pub mod scope;
pub mod switcher;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
