//! Responsive Switcher.
//!
//! Client-side half of the system: toggles each qualifying element's
//! background between its desktop and mobile image as the viewport crosses
//! the breakpoint.
//!
//! The state machine lives here in Rust and runs against any host that
//! implements [`SwitchDocument`] and [`ViewportObserver`]. The browser build
//! of the same machine is [`SCRIPT`]; [`StaticDocument`] is an in-memory host
//! used by the `simulate` command and the tests.
//!
//! # State machine
//!
//! Per element, states `Desktop` and `Mobile`, starting in `Desktop`:
//!
//! ```text
//!            width < 768 and mobile reference present
//!  Desktop ─────────────────────────────────────────────▶ Mobile
//!     ▲                                                     │
//!     └──────────────── width >= 768 ───────────────────────┘
//!                 (restore cached original)
//! ```
//!
//! Each evaluation is a pure function of the current width. Nothing
//! accumulates between evaluations.
//!
//! # Capture once
//!
//! An element's desktop background is read the first time the switcher sees
//! it and never again. Activating a second time (after content was inserted,
//! say) only picks up new elements, so a mobile image already applied can
//! never be mistaken for the original.

mod static_dom;

pub use static_dom::{ElementRef, StaticDocument};

use std::collections::HashMap;
use std::hash::Hash;

/// Viewport width, in CSS pixels, separating mobile from desktop.
pub const BREAKPOINT_PX: u32 = 768;

/// Browser rendition of the switcher.
pub const SCRIPT: &str = include_str!("../../static/switcher.js");

/// Which presentation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointState {
    Desktop,
    Mobile,
}

impl BreakpointState {
    /// Below the breakpoint is mobile; the breakpoint itself is desktop.
    pub fn for_width(width: u32) -> Self {
        if width < BREAKPOINT_PX {
            BreakpointState::Mobile
        } else {
            BreakpointState::Desktop
        }
    }
}

/// The DOM as seen by the switcher.
///
/// Elements are identified by handle, so the switcher's table is keyed by
/// element identity rather than by any attribute value.
pub trait SwitchDocument {
    type Element: Copy + Eq + Hash;

    /// Every element carrying a mobile-background reference, in document
    /// order.
    fn qualifying_elements(&self) -> Vec<Self::Element>;

    /// The element's live inline `background-image` value (`""` if unset).
    fn background_image(&self, element: Self::Element) -> String;

    fn set_background_image(&mut self, element: Self::Element, value: &str);

    /// The element's mobile image URL, if it has a non-empty one.
    fn mobile_reference(&self, element: Self::Element) -> Option<String>;
}

/// How the switcher is notified of breakpoint crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    /// `change` events on a media query list.
    ChangeEvent,
    /// The older `addListener` callback.
    LegacyListener,
}

/// The viewport the switcher observes.
pub trait ViewportObserver {
    fn width(&self) -> u32;

    /// Whether the change-event API is available.
    fn supports_change_events(&self) -> bool;

    /// Subscribe to breakpoint crossings with the given mechanism. After
    /// this the host calls [`Switcher::on_viewport_change`] on every
    /// crossing.
    fn subscribe(&mut self, kind: ObserverKind);
}

/// Per-element state owned by the switcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBackgroundState<E> {
    pub element: E,
    /// Background captured at first sight. The only source of truth for the
    /// desktop state.
    pub desktop: String,
    pub state: BreakpointState,
}

/// Drives every qualifying element of one document.
#[derive(Debug)]
pub struct Switcher<E> {
    elements: Vec<ElementBackgroundState<E>>,
    index: HashMap<E, usize>,
    observer: Option<ObserverKind>,
}

impl<E: Copy + Eq + Hash> Default for Switcher<E> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            index: HashMap::new(),
            observer: None,
        }
    }
}

impl<E: Copy + Eq + Hash> Switcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect qualifying elements, subscribe once, and apply the state for
    /// the current width.
    ///
    /// Safe to call repeatedly: known elements keep their cached original and
    /// the observer is registered only on the first call that finds
    /// elements. Returns the number of newly tracked elements.
    pub fn activate<D, V>(&mut self, document: &mut D, viewport: &mut V) -> usize
    where
        D: SwitchDocument<Element = E>,
        V: ViewportObserver,
    {
        let mut added = 0;
        for element in document.qualifying_elements() {
            if self.index.contains_key(&element) {
                continue;
            }
            let desktop = document.background_image(element);
            self.index.insert(element, self.elements.len());
            self.elements.push(ElementBackgroundState {
                element,
                desktop,
                state: BreakpointState::Desktop,
            });
            added += 1;
        }

        if self.elements.is_empty() {
            tracing::debug!("no qualifying elements, switcher idle");
            return 0;
        }

        if self.observer.is_none() {
            let kind = if viewport.supports_change_events() {
                ObserverKind::ChangeEvent
            } else {
                ObserverKind::LegacyListener
            };
            viewport.subscribe(kind);
            tracing::debug!(?kind, "subscribed to viewport changes");
            self.observer = Some(kind);
        }

        self.evaluate(document, viewport.width());
        added
    }

    /// Observer callback: re-apply the state for `width` to all elements.
    pub fn on_viewport_change<D>(&mut self, document: &mut D, width: u32)
    where
        D: SwitchDocument<Element = E>,
    {
        self.evaluate(document, width);
    }

    fn evaluate<D>(&mut self, document: &mut D, width: u32)
    where
        D: SwitchDocument<Element = E>,
    {
        let wanted = BreakpointState::for_width(width);
        for entry in &mut self.elements {
            let mobile = match wanted {
                BreakpointState::Mobile => document.mobile_reference(entry.element),
                BreakpointState::Desktop => None,
            };
            match mobile {
                Some(url) => {
                    document.set_background_image(entry.element, &format!("url({url})"));
                    entry.state = BreakpointState::Mobile;
                }
                None => {
                    document.set_background_image(entry.element, &entry.desktop);
                    entry.state = BreakpointState::Desktop;
                }
            }
        }
        tracing::trace!(width, ?wanted, elements = self.elements.len(), "evaluated breakpoint");
    }

    pub fn elements(&self) -> &[ElementBackgroundState<E>] {
        &self.elements
    }

    pub fn state_of(&self, element: E) -> Option<&ElementBackgroundState<E>> {
        self.index.get(&element).map(|&i| &self.elements[i])
    }

    pub fn observer(&self) -> Option<ObserverKind> {
        self.observer
    }
}

/// A viewport with a fixed width, recording its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedViewport {
    pub width: u32,
    pub change_events: bool,
    pub subscriptions: Vec<ObserverKind>,
}

impl FixedViewport {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            change_events: true,
            subscriptions: Vec::new(),
        }
    }

    /// A viewport whose host only offers the legacy listener.
    pub fn legacy(width: u32) -> Self {
        Self {
            change_events: false,
            ..Self::new(width)
        }
    }
}

impl ViewportObserver for FixedViewport {
    fn width(&self) -> u32 {
        self.width
    }

    fn supports_change_events(&self) -> bool {
        self.change_events
    }

    fn subscribe(&mut self, kind: ObserverKind) {
        self.subscriptions.push(kind);
    }
}

/// Live backgrounds after one simulated viewport width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationStep {
    pub width: u32,
    pub state: BreakpointState,
    /// `(tag name, background-image)` per qualifying element.
    pub backgrounds: Vec<(String, String)>,
}

/// Activate a switcher over `html` at the first width, then replay the
/// remaining widths as viewport changes.
pub fn simulate(html: &str, widths: &[u32]) -> Vec<SimulationStep> {
    let Some((&first, rest)) = widths.split_first() else {
        return Vec::new();
    };
    let mut document = StaticDocument::parse(html);
    let mut viewport = FixedViewport::new(first);
    let mut switcher = Switcher::new();
    switcher.activate(&mut document, &mut viewport);

    let mut steps = vec![snapshot(&document, first)];
    for &width in rest {
        switcher.on_viewport_change(&mut document, width);
        steps.push(snapshot(&document, width));
    }
    steps
}

fn snapshot(document: &StaticDocument, width: u32) -> SimulationStep {
    SimulationStep {
        width,
        state: BreakpointState::for_width(width),
        backgrounds: document
            .qualifying_elements()
            .into_iter()
            .map(|el| (document.tag_name(el).to_string(), document.background_image(el)))
            .collect(),
    }
}
