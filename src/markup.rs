//! Linear start-tag scanning and byte-range editing of HTML fragments.
//!
//! This is deliberately not an HTML parser. It finds start tags in a single
//! forward pass and records where each attribute name and value sits in the
//! original text, so callers can rewrite attributes by splicing bytes rather
//! than rebuilding the document.
//!
//! ## What the scanner understands
//!
//! - comments (`<!-- ... -->`), doctype and other `<!...>` declarations,
//!   processing instructions (`<?...>`) and end tags are skipped
//! - the content of raw-text elements (`script`, `style`, `textarea`,
//!   `title`) is skipped up to the matching end tag
//! - attribute values may be double-quoted, single-quoted, unquoted, or absent
//! - tag and attribute names compare ASCII case-insensitively
//!
//! A tag with no closing `>` ends the scan.
//!
//! ## Editing
//!
//! [`Splice`] collects edits against a [`StartTag`] (set or append to an
//! attribute, insert text before the tag) and applies them all at once.

use crate::escape::decode_attr;
use std::borrow::Cow;
use std::ops::Range;

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// The quoting style of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Double,
    Single,
    Unquoted,
}

/// Location of an attribute value inside the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrValue {
    /// Byte range of the value text, excluding quotes.
    pub span: Range<usize>,
    pub quote: Quote,
}

/// One attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Byte range of the attribute name.
    pub name: Range<usize>,
    /// `None` for value-less attributes like `hidden`.
    pub value: Option<AttrValue>,
}

/// A start tag found by [`TagScanner`].
#[derive(Debug, Clone)]
pub struct StartTag<'a> {
    source: &'a str,
    /// Byte range from `<` through `>`.
    pub span: Range<usize>,
    name: Range<usize>,
    attributes: Vec<Attribute>,
    /// Where new attributes are inserted: right after the last attribute,
    /// or after the tag name when there are none.
    insert_at: usize,
    pub self_closing: bool,
}

impl<'a> StartTag<'a> {
    pub fn name(&self) -> &'a str {
        &self.source[self.name.clone()]
    }

    pub fn is(&self, tag_name: &str) -> bool {
        self.name().eq_ignore_ascii_case(tag_name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// First attribute with this name. Later duplicates are ignored, as
    /// browsers do.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| self.source[a.name.clone()].eq_ignore_ascii_case(name))
    }

    /// Raw (still escaped) value text. `Some("")` for value-less attributes.
    pub fn raw_value(&self, name: &str) -> Option<&'a str> {
        let source = self.source;
        self.attribute(name).map(|a| match &a.value {
            Some(v) => &source[v.span.clone()],
            None => "",
        })
    }

    /// Decoded attribute value.
    pub fn value(&self, name: &str) -> Option<Cow<'a, str>> {
        self.raw_value(name).map(decode_attr)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Whether the whitespace-separated `class` list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.value("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Iterator over the start tags of an HTML fragment, in document order.
pub struct TagScanner<'a> {
    html: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html, pos: 0 }
    }

    /// Skip past the end tag closing a raw-text element opened at `from`.
    fn skip_raw_text(&mut self, tag_name: &str, from: usize) {
        let bytes = self.html.as_bytes();
        let mut search = from;
        while let Some(rel) = self.html[search..].find("</") {
            let start = search + rel + 2;
            let end = start + tag_name.len();
            if self
                .html
                .get(start..end)
                .is_some_and(|s| s.eq_ignore_ascii_case(tag_name))
                && bytes
                    .get(end)
                    .is_none_or(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
            {
                self.pos = match self.html[end..].find('>') {
                    Some(gt) => end + gt + 1,
                    None => self.html.len(),
                };
                return;
            }
            search = start;
        }
        self.pos = self.html.len();
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = StartTag<'a>;

    fn next(&mut self) -> Option<StartTag<'a>> {
        let html = self.html;
        let bytes = html.as_bytes();
        loop {
            let lt = self.pos + html.get(self.pos..)?.find('<')?;
            let rest = &html[lt..];

            if rest.starts_with("<!--") {
                self.pos = match rest[4..].find("-->") {
                    Some(end) => lt + 4 + end + 3,
                    None => html.len(),
                };
                continue;
            }
            match bytes.get(lt + 1) {
                Some(b'!' | b'?' | b'/') => {
                    self.pos = match rest.find('>') {
                        Some(gt) => lt + gt + 1,
                        None => html.len(),
                    };
                    continue;
                }
                Some(b) if b.is_ascii_alphabetic() => {}
                _ => {
                    // Stray `<` in text.
                    self.pos = lt + 1;
                    continue;
                }
            }

            let Some(tag) = parse_start_tag(html, lt) else {
                self.pos = html.len();
                return None;
            };
            self.pos = tag.span.end;
            if !tag.self_closing {
                if let Some(raw) = RAW_TEXT_ELEMENTS.iter().find(|n| tag.is(n)) {
                    self.skip_raw_text(raw, tag.span.end);
                }
            }
            return Some(tag);
        }
    }
}

/// Parse the start tag whose `<` is at `lt`. `None` if it never closes.
fn parse_start_tag(html: &str, lt: usize) -> Option<StartTag<'_>> {
    let bytes = html.as_bytes();
    let at = |i: usize| bytes.get(i).copied();
    let is_space = |b: u8| b.is_ascii_whitespace();

    let name_start = lt + 1;
    let mut i = name_start;
    while let Some(b) = at(i) {
        if is_space(b) || b == b'/' || b == b'>' {
            break;
        }
        i += 1;
    }
    let name = name_start..i;
    let mut attributes = Vec::new();
    let mut last_end = i;

    loop {
        while at(i).is_some_and(is_space) {
            i += 1;
        }
        match at(i)? {
            b'>' => {
                return Some(StartTag {
                    source: html,
                    span: lt..i + 1,
                    name,
                    attributes,
                    insert_at: last_end,
                    self_closing: false,
                });
            }
            b'/' => {
                if at(i + 1) == Some(b'>') {
                    return Some(StartTag {
                        source: html,
                        span: lt..i + 2,
                        name,
                        attributes,
                        insert_at: last_end,
                        self_closing: true,
                    });
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        // Attribute name. A leading `=` belongs to the name.
        let attr_start = i;
        i += 1;
        while let Some(b) = at(i) {
            if is_space(b) || b == b'/' || b == b'>' || b == b'=' {
                break;
            }
            i += 1;
        }
        let attr_name = attr_start..i;

        let mut probe = i;
        while at(probe).is_some_and(is_space) {
            probe += 1;
        }
        if at(probe) != Some(b'=') {
            last_end = i;
            attributes.push(Attribute {
                name: attr_name,
                value: None,
            });
            continue;
        }
        i = probe + 1;
        while at(i).is_some_and(is_space) {
            i += 1;
        }

        let value = match at(i)? {
            q @ (b'"' | b'\'') => {
                let start = i + 1;
                let close = html[start..].find(q as char)? + start;
                i = close + 1;
                AttrValue {
                    span: start..close,
                    quote: if q == b'"' { Quote::Double } else { Quote::Single },
                }
            }
            b'>' => AttrValue {
                span: i..i,
                quote: Quote::Unquoted,
            },
            _ => {
                let start = i;
                while let Some(b) = at(i) {
                    if is_space(b) || b == b'>' {
                        break;
                    }
                    i += 1;
                }
                AttrValue {
                    span: start..i,
                    quote: Quote::Unquoted,
                }
            }
        };
        last_end = i;
        attributes.push(Attribute {
            name: attr_name,
            value: Some(value),
        });
    }
}

/// Find the first start tag satisfying `predicate`.
pub fn find_first<'a>(html: &'a str, predicate: impl Fn(&StartTag<'a>) -> bool) -> Option<StartTag<'a>> {
    TagScanner::new(html).find(|tag| predicate(tag))
}

/// A set of byte-range edits against one source text, applied in one pass.
///
/// Values handed to the editing methods must already be escaped for
/// attribute context; `Splice` only takes care of quoting.
#[derive(Debug, Default)]
pub struct Splice {
    edits: Vec<(Range<usize>, String)>,
}

impl Splice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Insert raw markup immediately before the tag.
    pub fn insert_before(&mut self, tag: &StartTag<'_>, markup: String) {
        let at = tag.span.start;
        self.edits.push((at..at, markup));
    }

    /// Set an attribute, replacing the value of an existing one.
    pub fn set_attribute(&mut self, tag: &StartTag<'_>, name: &str, escaped: &str) {
        match tag.attribute(name) {
            Some(attr) => self.replace_value(tag, attr, escaped.to_string()),
            None => self.add_attribute(tag, name, escaped),
        }
    }

    /// Combine an attribute's current raw value with new text via `merge`.
    ///
    /// `merge` receives the raw existing value (`""` when absent or
    /// value-less) and returns the new raw value.
    pub fn merge_attribute(
        &mut self,
        tag: &StartTag<'_>,
        name: &str,
        merge: impl FnOnce(&str) -> String,
    ) {
        match tag.attribute(name) {
            Some(attr) => {
                let existing = tag.raw_value(name).unwrap_or_default();
                let merged = merge(existing);
                self.replace_value(tag, attr, merged);
            }
            None => {
                let merged = merge("");
                self.add_attribute(tag, name, &merged);
            }
        }
    }

    fn add_attribute(&mut self, tag: &StartTag<'_>, name: &str, escaped: &str) {
        let at = tag.insert_at;
        self.edits.push((at..at, format!(" {name}=\"{escaped}\"")));
    }

    fn replace_value(&mut self, tag: &StartTag<'_>, attr: &Attribute, escaped: String) {
        match &attr.value {
            Some(AttrValue {
                span,
                quote: Quote::Double,
            }) => self.edits.push((span.clone(), escaped.replace('"', "&quot;"))),
            Some(AttrValue {
                span,
                quote: Quote::Single,
            }) => self.edits.push((span.clone(), escaped.replace('\'', "&#39;"))),
            Some(AttrValue {
                span,
                quote: Quote::Unquoted,
            }) => self
                .edits
                .push((span.clone(), format!("\"{}\"", escaped.replace('"', "&quot;")))),
            // Rewrite the whole name so the value stays attached to it when
            // new attributes are appended at the same offset.
            None => {
                let name = &tag.source[attr.name.clone()];
                self.edits.push((
                    attr.name.clone(),
                    format!("{name}=\"{}\"", escaped.replace('"', "&quot;")),
                ));
            }
        }
    }

    /// Apply every edit to `source`. Edits are ordered by position; inserts
    /// at the same position keep the order they were recorded in.
    ///
    /// An edit overlapping one already applied is dropped, so two writes to
    /// the same attribute keep the first.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|(range, _)| (range.start, range.end));
        let added: usize = self.edits.iter().map(|(_, text)| text.len()).sum();
        let mut out = String::with_capacity(source.len() + added);
        let mut cursor = 0;
        for (range, text) in &self.edits {
            if range.start < cursor {
                tracing::warn!(?range, "dropping overlapping edit");
                continue;
            }
            out.push_str(&source[cursor..range.start]);
            out.push_str(text);
            cursor = range.end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(html: &str) -> Vec<String> {
        TagScanner::new(html).map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn scans_start_tags_in_order() {
        assert_eq!(tags("<div><p>a</p><img src=x></div>"), ["div", "p", "img"]);
    }

    #[test]
    fn skips_comments_and_declarations() {
        let html = "<!DOCTYPE html><!-- <div class=x> --><?php x ?><section>";
        assert_eq!(tags(html), ["section"]);
    }

    #[test]
    fn skips_raw_text_content() {
        let html = "<script>var s = '<div class=\"wp-block-cover\">';</script><span>";
        assert_eq!(tags(html), ["script", "span"]);
    }

    #[test]
    fn raw_text_end_tag_is_case_insensitive() {
        let html = "<STYLE>a>b{}</Style ><em>";
        assert_eq!(tags(html), ["STYLE", "em"]);
    }

    #[test]
    fn stray_angle_bracket_in_text_is_ignored() {
        assert_eq!(tags("1 < 2 <b>bold</b>"), ["b"]);
    }

    #[test]
    fn quoted_value_may_contain_angle_bracket() {
        let html = r#"<div title="a > b" class="x"><p>"#;
        let first = TagScanner::new(html).next().unwrap();
        assert_eq!(first.raw_value("title"), Some("a > b"));
        assert_eq!(first.raw_value("class"), Some("x"));
        assert_eq!(tags(html), ["div", "p"]);
    }

    #[test]
    fn parses_all_value_forms() {
        let html = r#"<input type=text value='it''s' disabled data-x =  "y">"#;
        let tag = TagScanner::new(html).next().unwrap();
        assert_eq!(tag.raw_value("type"), Some("text"));
        assert_eq!(tag.raw_value("value"), Some("it"));
        assert_eq!(tag.raw_value("disabled"), Some(""));
        assert_eq!(tag.raw_value("data-x"), Some("y"));
        assert_eq!(tag.attribute("type").unwrap().value.as_ref().unwrap().quote, Quote::Unquoted);
    }

    #[test]
    fn attribute_lookup_is_case_insensitive_and_first_wins() {
        let tag = TagScanner::new(r#"<div CLASS="a" class="b">"#).next().unwrap();
        assert_eq!(tag.raw_value("class"), Some("a"));
    }

    #[test]
    fn has_class_matches_whole_tokens() {
        let tag = TagScanner::new(r#"<div class="wp-block-cover   is-light">"#)
            .next()
            .unwrap();
        assert!(tag.has_class("wp-block-cover"));
        assert!(tag.has_class("is-light"));
        assert!(!tag.has_class("wp-block"));
    }

    #[test]
    fn value_decodes_references() {
        let tag = TagScanner::new(r#"<a href="/x?a=1&amp;b=2">"#).next().unwrap();
        assert_eq!(tag.value("href").as_deref(), Some("/x?a=1&b=2"));
    }

    #[test]
    fn self_closing_tag_detected() {
        let tag = TagScanner::new("<br/>").next().unwrap();
        assert!(tag.self_closing);
        assert_eq!(tag.span, 0..5);
    }

    #[test]
    fn unterminated_tag_ends_scan() {
        assert_eq!(tags("<p>ok</p><div class=\"x"), ["p"]);
    }

    #[test]
    fn find_first_with_predicate() {
        let html = r#"<div class="a"><div class="b">"#;
        let tag = find_first(html, |t| t.has_class("b")).unwrap();
        assert_eq!(tag.span.start, 15);
    }

    #[test]
    fn set_attribute_adds_missing() {
        let html = r#"<div class="c">x</div>"#;
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "data-id", "42");
        assert_eq!(splice.apply(html), r#"<div class="c" data-id="42">x</div>"#);
    }

    #[test]
    fn set_attribute_before_self_closing_slash() {
        let html = "<img src=a.png />";
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "alt", "");
        assert_eq!(splice.apply(html), r#"<img src=a.png alt="" />"#);
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let html = r#"<div data-id='1' class=c>"#;
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "data-id", "2");
        splice.set_attribute(&tag, "class", "d");
        assert_eq!(splice.apply(html), r#"<div data-id='2' class="d">"#);
    }

    #[test]
    fn merge_attribute_gives_value_to_bare_attribute() {
        let html = "<div style>";
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.merge_attribute(&tag, "style", |old| format!("{old}color:red"));
        assert_eq!(splice.apply(html), r#"<div style="color:red">"#);
    }

    #[test]
    fn value_for_trailing_bare_attribute_stays_attached() {
        let html = r#"<div class="c" data-m></div>"#;
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "data-m", "b.png");
        splice.set_attribute(&tag, "data-id", "x");
        let out = splice.apply(html);
        assert_eq!(out, r#"<div class="c" data-m="b.png" data-id="x"></div>"#);
        let again = TagScanner::new(&out).next().unwrap();
        assert_eq!(again.raw_value("data-m"), Some("b.png"));
    }

    #[test]
    fn overlapping_edits_keep_the_first() {
        let html = r#"<div data-m="old">"#;
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "data-m", "first");
        splice.set_attribute(&tag, "DATA-M", "second");
        assert_eq!(splice.apply(html), r#"<div data-m="first">"#);
    }

    #[test]
    fn overlapping_bare_attribute_edits_keep_the_first() {
        let html = "<div hidden>";
        let tag = TagScanner::new(html).next().unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "hidden", "a");
        splice.set_attribute(&tag, "hidden", "b");
        assert_eq!(splice.apply(html), r#"<div hidden="a">"#);
    }

    #[test]
    fn edits_apply_in_position_order() {
        let html = r#"<p>a</p><div class="x">b</div>"#;
        let tag = find_first(html, |t| t.is("div")).unwrap();
        let mut splice = Splice::new();
        splice.set_attribute(&tag, "id", "k");
        splice.insert_before(&tag, "<hr>".to_string());
        assert_eq!(splice.apply(html), r#"<p>a</p><hr><div class="x" id="k">b</div>"#);
    }
}
