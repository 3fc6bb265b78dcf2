//! The config page: loading screen until the engine is ready, then the
//! editor with live validation.

use crate::bridge::{EditorText, ValidationBridge, ValidationSink};
use crate::capability::Capabilities;
use crate::error::EngineError;
use crate::orchestrator::{BootstrapState, BootstrapStatus};
use crate::template::DEFAULT_CONFIG;

/// Caption of the loading screen.
pub const LOADING_TEXT: &str = "Loading WASM module...";

/// What the page shows for a given bootstrap status.
#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    /// Loading screen with a progress bar.
    Loading { progress: f64, text: &'static str },
    /// Bootstrap failed: no loading screen and no editor.
    Unavailable,
    /// The editor, backed by a ready engine.
    Editor { version: String },
}

impl PageView {
    pub fn from_status(status: &BootstrapStatus) -> Self {
        match status.state {
            BootstrapState::Ready => PageView::Editor {
                version: status.version.clone(),
            },
            BootstrapState::Failed => PageView::Unavailable,
            _ => PageView::Loading {
                progress: status.progress,
                text: LOADING_TEXT,
            },
        }
    }

    pub fn shows_editor(&self) -> bool {
        matches!(self, PageView::Editor { .. })
    }
}

/// Editor contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl EditorText for TextBuffer {
    fn current_text(&self) -> Result<String, EngineError> {
        Ok(self.text.clone())
    }
}

/// The last validation outcome shown under the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDisplay {
    pub result: Option<String>,
    pub is_valid: bool,
}

impl ValidationSink for ValidationDisplay {
    fn set_result(&mut self, message: String) {
        self.result = Some(message);
    }

    fn set_valid(&mut self, valid: bool) {
        self.is_valid = valid;
    }
}

/// An editing session against a ready engine.
///
/// Constructing a session requires [`Capabilities`], so a session cannot
/// exist before bootstrap reaches `Ready`.
pub struct EditorSession {
    capabilities: Capabilities,
    bridge: ValidationBridge,
    editor: Option<TextBuffer>,
    display: ValidationDisplay,
}

impl EditorSession {
    /// A session whose editor has not mounted yet.
    pub fn without_editor(capabilities: Capabilities, bridge: ValidationBridge) -> Self {
        Self {
            capabilities,
            bridge,
            editor: None,
            display: ValidationDisplay::default(),
        }
    }

    /// A session opened on `text`, validated immediately.
    pub fn new(
        capabilities: Capabilities,
        bridge: ValidationBridge,
        text: impl Into<String>,
    ) -> Self {
        let mut session = Self::without_editor(capabilities, bridge);
        session.set_text(text);
        session
    }

    /// A session opened on the built-in template.
    pub fn with_template(capabilities: Capabilities, bridge: ValidationBridge) -> Self {
        Self::new(capabilities, bridge, DEFAULT_CONFIG)
    }

    /// Replace the editor contents and re-validate.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.editor = Some(TextBuffer::new(text));
        self.revalidate();
    }

    /// Validate the current contents again.
    pub fn revalidate(&mut self) {
        let editor = self.editor.as_ref().map(|e| e as &dyn EditorText);
        self.bridge
            .validate(editor, &self.capabilities, &mut self.display);
    }

    pub fn text(&self) -> Option<&str> {
        self.editor.as_ref().map(TextBuffer::text)
    }

    pub fn display(&self) -> &ValidationDisplay {
        &self.display
    }

    pub fn result(&self) -> Option<&str> {
        self.display.result.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.display.is_valid
    }

    pub fn version(&self) -> &str {
        self.capabilities.version()
    }
}
