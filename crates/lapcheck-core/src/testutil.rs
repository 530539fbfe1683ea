//! Test utilities: an in-memory [`PageDriver`].
//!
//! `MockPage` models just enough of a DOM for the runner: elements keyed by
//! selector with text, visibility and a bounding-box centre, plus scripts
//! that reveal or rewrite elements when evaluated. State lives behind
//! `Arc<Mutex<_>>` so tests can keep a clone and assert on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::Point;
use crate::traits::PageDriver;

/// Smallest byte sequence that starts like a PNG file.
pub const PNG_STUB: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub const CRASH_SCRIPT: &str = "player.crashed = true;\ncheckGameEnd();";
pub const FINISH_SCRIPT: &str = "player.finished = true;\ncheckGameEnd();";

/// A fake element.
#[derive(Debug, Clone, PartialEq)]
pub struct MockElement {
    pub text: String,
    pub visible: bool,
    pub center: Point,
}

impl MockElement {
    pub fn visible(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: true,
            center: Point::new(640.0, 360.0),
        }
    }

    pub fn hidden(text: &str) -> Self {
        Self {
            visible: false,
            ..Self::visible(text)
        }
    }
}

#[derive(Default)]
struct MockState {
    loaded: Option<String>,
    elements: HashMap<String, MockElement>,
    /// Script → elements written when that script runs.
    effects: HashMap<String, Vec<(String, MockElement)>>,
    script_errors: HashMap<String, String>,
    goto_error: Option<AppError>,
    screenshot: Vec<u8>,
    calls: Vec<String>,
}

/// In-memory page for runner tests.
#[derive(Clone)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Empty page that returns [`PNG_STUB`] for screenshots.
    pub fn new() -> Self {
        let state = MockState {
            screenshot: PNG_STUB.to_vec(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A game page: visible canvas, hidden game-over overlay, and the crash /
    /// finish scripts wired to show `crash_message` / the finish message.
    pub fn game(crash_message: &str) -> Self {
        Self::new()
            .with_element("#gameCanvas", MockElement::visible(""))
            .with_element("#game-over-message", MockElement::hidden("You Crashed!"))
            .on_script(
                CRASH_SCRIPT,
                "#game-over-message",
                MockElement::visible(crash_message),
            )
            .on_script(
                FINISH_SCRIPT,
                "#game-over-message",
                MockElement::visible("Race Finished! Lap Complete!"),
            )
    }

    pub fn with_element(self, selector: &str, element: MockElement) -> Self {
        self.lock().elements.insert(selector.to_string(), element);
        self
    }

    pub fn on_script(self, script: &str, selector: &str, element: MockElement) -> Self {
        self.lock()
            .effects
            .entry(script.to_string())
            .or_default()
            .push((selector.to_string(), element));
        self
    }

    pub fn with_script_error(self, script: &str, message: &str) -> Self {
        self.lock()
            .script_errors
            .insert(script.to_string(), message.to_string());
        self
    }

    pub fn with_goto_error(self, error: AppError) -> Self {
        self.lock().goto_error = Some(error);
        self
    }

    pub fn with_screenshot(self, bytes: &[u8]) -> Self {
        self.lock().screenshot = bytes.to_vec();
        self
    }

    /// Every driver call so far, as `"method arg"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// URL of the last successful `goto`.
    pub fn loaded_url(&self) -> Option<String> {
        self.lock().loaded.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        self.record(format!("goto {url}"));
        let mut state = self.lock();
        if let Some(e) = state.goto_error.take() {
            return Err(e);
        }
        state.loaded = Some(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AppError> {
        self.record(format!("evaluate {script}"));
        let mut state = self.lock();
        if state.loaded.is_none() {
            return Err(AppError::ScriptError(
                "ReferenceError: no page loaded".into(),
            ));
        }
        if let Some(message) = state.script_errors.get(script) {
            return Err(AppError::ScriptError(message.clone()));
        }
        if let Some(effects) = state.effects.get(script).cloned() {
            for (selector, element) in effects {
                state.elements.insert(selector, element);
            }
        }
        Ok(serde_json::Value::Null)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, AppError> {
        self.record(format!("is_visible {selector}"));
        Ok(self
            .lock()
            .elements
            .get(selector)
            .is_some_and(|e| e.visible))
    }

    async fn inner_text(&self, selector: &str) -> Result<String, AppError> {
        self.record(format!("inner_text {selector}"));
        self.lock()
            .elements
            .get(selector)
            .map(|e| e.text.clone())
            .ok_or_else(|| AppError::ElementNotFound(selector.to_string()))
    }

    async fn element_center(&self, selector: &str) -> Result<Point, AppError> {
        self.record(format!("element_center {selector}"));
        self.lock()
            .elements
            .get(selector)
            .map(|e| e.center)
            .ok_or_else(|| AppError::ElementNotFound(selector.to_string()))
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), AppError> {
        self.record(format!("drag {},{} -> {},{}", from.x, from.y, to.x, to.y));
        Ok(())
    }

    async fn click(&self, at: Point) -> Result<(), AppError> {
        self.record(format!("click {},{}", at.x, at.y));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AppError> {
        self.record("screenshot".to_string());
        Ok(self.lock().screenshot.clone())
    }
}
