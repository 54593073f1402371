//! In-process window host that keeps a parsed element model instead of
//! painting anything. Backs the CLI and the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{SurfaceError, SurfaceWindow, WindowFeatures, WindowHost};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementState {
    pub text: String,
    pub font_size_px: Option<u32>,
    pub value: Option<String>,
    pub checked: bool,
}

#[derive(Default)]
struct WindowState {
    closed: bool,
    blocked: bool,
    elements: BTreeMap<String, ElementState>,
    writes: usize,
}

pub struct HeadlessWindow {
    name: String,
    features: WindowFeatures,
    state: Mutex<WindowState>,
}

impl HeadlessWindow {
    fn new(name: &str, features: &WindowFeatures) -> Self {
        Self {
            name: name.to_string(),
            features: features.clone(),
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &WindowFeatures {
        &self.features
    }

    /// Simulates the user closing the window.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// Simulates a stray navigation or dev-tools wipe: the window stays open
    /// but its document is empty.
    pub fn clear_document(&self) {
        self.state.lock().elements.clear();
    }

    /// Makes every subsequent write fail, as a hostile window would.
    pub fn block_writes(&self, blocked: bool) {
        self.state.lock().blocked = blocked;
    }

    pub fn element(&self, id: &str) -> Option<ElementState> {
        self.state.lock().elements.get(id).cloned()
    }

    pub fn text_of(&self, id: &str) -> Option<String> {
        self.element(id).map(|e| e.text)
    }

    pub fn font_size_of(&self, id: &str) -> Option<u32> {
        self.element(id).and_then(|e| e.font_size_px)
    }

    pub fn value_of(&self, id: &str) -> Option<String> {
        self.element(id).and_then(|e| e.value)
    }

    pub fn checked_of(&self, id: &str) -> Option<bool> {
        self.element(id).map(|e| e.checked)
    }

    /// Number of full document writes so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn with_element<F>(&self, id: &str, apply: F) -> Result<(), SurfaceError>
    where
        F: FnOnce(&mut ElementState),
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SurfaceError::Closed);
        }
        if state.blocked {
            return Err(SurfaceError::Blocked);
        }
        let element = state
            .elements
            .get_mut(id)
            .ok_or_else(|| SurfaceError::missing(id))?;
        apply(element);
        Ok(())
    }
}

fn parse_elements(html: &str) -> BTreeMap<String, ElementState> {
    let document = Html::parse_document(html);
    let mut elements = BTreeMap::new();
    let Ok(with_id) = Selector::parse("[id]") else {
        return elements;
    };
    for node in document.select(&with_id) {
        let attrs = node.value();
        let Some(id) = attrs.id() else { continue };
        elements.insert(
            id.to_string(),
            ElementState {
                text: node.text().collect::<String>().trim().to_string(),
                font_size_px: attrs.attr("style").and_then(inline_font_size),
                value: attrs.attr("value").map(str::to_string),
                checked: attrs.attr("checked").is_some(),
            },
        );
    }
    elements
}

fn inline_font_size(style: &str) -> Option<u32> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim() != "font-size" {
            return None;
        }
        value.trim().strip_suffix("px")?.trim().parse().ok()
    })
}

impl SurfaceWindow for HeadlessWindow {
    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn has_element(&self, id: &str) -> Result<bool, SurfaceError> {
        let state = self.state.lock();
        if state.closed {
            return Err(SurfaceError::Closed);
        }
        Ok(state.elements.contains_key(id))
    }

    fn write_document(&self, html: &str) -> Result<(), SurfaceError> {
        let elements = parse_elements(html);
        let mut state = self.state.lock();
        if state.closed {
            return Err(SurfaceError::Closed);
        }
        if state.blocked {
            return Err(SurfaceError::Blocked);
        }
        state.elements = elements;
        state.writes += 1;
        debug!(window = %self.name, elements = state.elements.len(), "document written");
        Ok(())
    }

    fn set_text(&self, id: &str, text: &str) -> Result<(), SurfaceError> {
        self.with_element(id, |e| e.text = text.to_string())
    }

    fn set_font_size(&self, id: &str, px: u32) -> Result<(), SurfaceError> {
        self.with_element(id, |e| e.font_size_px = Some(px))
    }

    fn set_value(&self, id: &str, value: &str) -> Result<(), SurfaceError> {
        self.with_element(id, |e| e.value = Some(value.to_string()))
    }

    fn set_checked(&self, id: &str, checked: bool) -> Result<(), SurfaceError> {
        self.with_element(id, |e| e.checked = checked)
    }

    fn focus(&self) {}
}

/// Window host keyed by window name.
#[derive(Default)]
pub struct HeadlessWindowHost {
    windows: Mutex<HashMap<String, Arc<HeadlessWindow>>>,
    opened: Mutex<usize>,
    refuse: Mutex<bool>,
}

impl HeadlessWindowHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Live window registered under `name`, if any.
    pub fn window(&self, name: &str) -> Option<Arc<HeadlessWindow>> {
        self.windows
            .lock()
            .get(name)
            .filter(|w| !w.is_closed())
            .cloned()
    }

    /// Number of distinct windows created.
    pub fn opened(&self) -> usize {
        *self.opened.lock()
    }

    /// Simulates a popup blocker.
    pub fn refuse_popups(&self, refuse: bool) {
        *self.refuse.lock() = refuse;
    }
}

impl WindowHost for HeadlessWindowHost {
    fn open(
        &self,
        name: &str,
        features: &WindowFeatures,
    ) -> Result<Arc<dyn SurfaceWindow>, SurfaceError> {
        if *self.refuse.lock() {
            return Err(SurfaceError::OpenRejected {
                name: name.to_string(),
                reason: "popup blocked".into(),
            });
        }
        let mut windows = self.windows.lock();
        if let Some(existing) = windows.get(name).filter(|w| !w.is_closed()) {
            return Ok(existing.clone());
        }
        let window = Arc::new(HeadlessWindow::new(name, features));
        windows.insert(name.to_string(), window.clone());
        *self.opened.lock() += 1;
        Ok(window)
    }
}
