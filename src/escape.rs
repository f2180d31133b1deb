//! URL sanitization and context-specific escaping.
//!
//! Every value the injector emits passes through one of these functions.
//! There are three output contexts, each with its own rules:
//!
//! | Context | Example | Function |
//! |---------|---------|----------|
//! | CSS `url()` token | `url(https://x/a.png)` | [`SafeUrl::parse`] |
//! | HTML attribute value | `data-mobile-bg="..."` | [`attr_value`] |
//! | CSS string inside `<style>` | `[data-id="..."]` | [`css_string`] |
//!
//! A [`SafeUrl`] is already valid in all three: it contains no whitespace,
//! quotes, parentheses, backslashes or angle brackets. Attribute escaping is
//! still applied on top because a URL may legitimately contain `&`.

use maud::Render;
use std::borrow::Cow;
use std::fmt;
use url::{ParseError, Url};

/// Schemes accepted for background images. Scheme-less URLs (relative paths,
/// protocol-relative `//host/...`) are always accepted.
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Why a URL was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRejection {
    /// Nothing left after trimming and stripping control characters.
    Empty,
    /// The URL names a scheme outside [`ALLOWED_SCHEMES`].
    DisallowedScheme(String),
    /// Absolute, but not a URL (bad host, port, ...).
    Malformed(ParseError),
}

impl fmt::Display for UrlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRejection::Empty => write!(f, "empty URL"),
            UrlRejection::DisallowedScheme(s) => write!(f, "disallowed URL scheme '{s}'"),
            UrlRejection::Malformed(e) => write!(f, "malformed URL: {e}"),
        }
    }
}

/// A URL that is safe to emit into CSS `url()`, HTML attributes and `<style>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeUrl(String);

impl SafeUrl {
    /// Sanitize a resolved URL.
    ///
    /// - Leading/trailing whitespace is trimmed, control characters dropped.
    /// - Only `http`, `https` and scheme-less URLs pass.
    /// - Characters that would terminate an unquoted CSS `url()` token or
    ///   open markup are percent-encoded.
    pub fn parse(raw: &str) -> Result<Self, UrlRejection> {
        let cleaned: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
        if cleaned.is_empty() {
            return Err(UrlRejection::Empty);
        }
        match Url::parse(&cleaned) {
            Ok(url) if !ALLOWED_SCHEMES.contains(&url.scheme()) => {
                return Err(UrlRejection::DisallowedScheme(url.scheme().to_string()));
            }
            Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {}
            Err(e) => return Err(UrlRejection::Malformed(e)),
        }

        let mut out = String::with_capacity(cleaned.len());
        for c in cleaned.chars() {
            match c {
                ' ' => out.push_str("%20"),
                '"' => out.push_str("%22"),
                '\'' => out.push_str("%27"),
                '(' => out.push_str("%28"),
                ')' => out.push_str("%29"),
                '<' => out.push_str("%3C"),
                '>' => out.push_str("%3E"),
                '\\' => out.push_str("%5C"),
                '`' => out.push_str("%60"),
                c if c.is_whitespace() => {}
                c => out.push(c),
            }
        }
        Ok(SafeUrl(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape text for a quoted HTML attribute value.
///
/// Uses maud's escaper (`&`, `<`, `>`, `"`) and additionally escapes `'` so
/// the result is valid inside single-quoted attributes too.
pub fn attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    value.render_to(&mut out);
    if out.contains('\'') {
        out = out.replace('\'', "&#39;");
    }
    out
}

/// Escape text for a double-quoted CSS string inside a `<style>` element.
///
/// `<` is hex-escaped so the text can never close the element.
pub fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '<' => out.push_str("\\3c "),
            '\n' => out.push_str("\\a "),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Decode the character references that appear in attribute values.
///
/// Handles the named references our own escaper produces plus numeric
/// references. Unknown references are left as written.
pub fn decode_attr(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|semi| decode_reference(&tail[1..semi]).map(|c| (c, semi))) {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
