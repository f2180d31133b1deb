//! In-memory [`SwitchDocument`] built from rendered HTML.
//!
//! Only what the switcher touches is modeled: the inline style of every
//! element carrying `data-mobile-bg`, and that attribute's value. Styles are
//! kept as an ordered declaration list so reads and writes behave like
//! `element.style.backgroundImage`.

use super::SwitchDocument;
use crate::inject::MOBILE_ATTRIBUTE;
use crate::markup::TagScanner;

/// Handle to an element of a [`StaticDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(usize);

impl ElementRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    property: String,
    value: String,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    declarations: Vec<Declaration>,
    mobile: String,
}

#[derive(Debug, Clone, Default)]
pub struct StaticDocument {
    elements: Vec<Element>,
}

impl StaticDocument {
    pub fn parse(html: &str) -> Self {
        let elements = TagScanner::new(html)
            .filter_map(|tag| {
                let mobile = tag.value(MOBILE_ATTRIBUTE)?.into_owned();
                let style = tag.value("style").unwrap_or_default();
                Some(Element {
                    tag: tag.name().to_ascii_lowercase(),
                    declarations: parse_declarations(&style),
                    mobile,
                })
            })
            .collect();
        Self { elements }
    }

    /// Add an element, as a script inserting content after load would.
    pub fn append_element(&mut self, background_image: &str, mobile: Option<&str>) -> ElementRef {
        let mut element = Element {
            tag: "div".to_string(),
            declarations: Vec::new(),
            mobile: mobile.unwrap_or_default().to_string(),
        };
        set_property(&mut element.declarations, "background-image", background_image);
        self.elements.push(element);
        ElementRef(self.elements.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn tag_name(&self, element: ElementRef) -> &str {
        &self.elements[element.0].tag
    }

    /// Serialized inline style of an element.
    pub fn style(&self, element: ElementRef) -> String {
        self.elements[element.0]
            .declarations
            .iter()
            .map(|d| format!("{}: {};", d.property, d.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SwitchDocument for StaticDocument {
    type Element = ElementRef;

    fn qualifying_elements(&self) -> Vec<ElementRef> {
        (0..self.elements.len()).map(ElementRef).collect()
    }

    fn background_image(&self, element: ElementRef) -> String {
        self.elements[element.0]
            .declarations
            .iter()
            .rev()
            .find(|d| d.property == "background-image")
            .map(|d| d.value.clone())
            .unwrap_or_default()
    }

    fn set_background_image(&mut self, element: ElementRef, value: &str) {
        set_property(&mut self.elements[element.0].declarations, "background-image", value);
    }

    fn mobile_reference(&self, element: ElementRef) -> Option<String> {
        let mobile = self.elements[element.0].mobile.trim();
        (!mobile.is_empty()).then(|| mobile.to_string())
    }
}

/// Empty `value` removes the property.
fn set_property(declarations: &mut Vec<Declaration>, property: &str, value: &str) {
    if value.is_empty() {
        declarations.retain(|d| d.property != property);
        return;
    }
    match declarations.iter_mut().rev().find(|d| d.property == property) {
        Some(d) => d.value = value.to_string(),
        None => declarations.push(Declaration {
            property: property.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_declarations(style: &str) -> Vec<Declaration> {
    split_top_level(style, ';')
        .into_iter()
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            (!property.is_empty() && !value.is_empty()).then(|| Declaration {
                property,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Split on `sep` outside of parentheses and quoted strings.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
