//! Validation bridge between editor content and the engine.
//!
//! Every call reads the editor's current text, asks the engine to validate
//! it, and reports two things: a timestamped line for display and a validity
//! flag. Results are formatted as
//!
//! ```text
//! 14:02:31 | Xray Core 1.8.0 | Configuration valid
//! 14:02:31 | Xray Core 1.8.0 | missing field: outbounds
//! 14:02:31 | Xray Core 1.8.0 | Validation error: <description>
//! ```
//!
//! Errors never escape the bridge: a failure reading the editor or calling
//! the engine becomes a `Validation error` line and an invalid flag.

use chrono::{Local, NaiveTime};

use crate::capability::Capabilities;
use crate::error::EngineError;

/// Message shown when the engine reports no errors.
pub const VALID_MESSAGE: &str = "Configuration valid";

/// Source of the text to validate.
pub trait EditorText {
    fn current_text(&self) -> Result<String, EngineError>;
}

impl EditorText for String {
    fn current_text(&self) -> Result<String, EngineError> {
        Ok(self.clone())
    }
}

/// Receives the outcome of a validation call.
pub trait ValidationSink {
    fn set_result(&mut self, message: String);
    fn set_valid(&mut self, valid: bool);
}

/// A pair of callbacks is a sink: the first receives the message, the
/// second the validity flag.
impl<R, V> ValidationSink for (R, V)
where
    R: FnMut(String),
    V: FnMut(bool),
{
    fn set_result(&mut self, message: String) {
        (self.0)(message)
    }

    fn set_valid(&mut self, valid: bool) {
        (self.1)(valid)
    }
}

/// One formatted validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub message: String,
    pub is_valid: bool,
}

type Clock = Box<dyn Fn() -> NaiveTime + Send + Sync>;

/// Runs validation calls and formats their results.
pub struct ValidationBridge {
    clock: Clock,
}

impl Default for ValidationBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationBridge {
    /// A bridge stamping results with local wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(|| Local::now().time())
    }

    pub fn with_clock(clock: impl Fn() -> NaiveTime + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Validate the editor's text and report to `sink`.
    ///
    /// Without an editor this is a no-op and `sink` is not called, so any
    /// previously displayed result stays in place.
    pub fn validate(
        &self,
        editor: Option<&dyn EditorText>,
        capabilities: &Capabilities,
        sink: &mut dyn ValidationSink,
    ) {
        let Some(editor) = editor else {
            tracing::trace!("validation skipped: no editor");
            return;
        };

        let report = self.evaluate(editor, capabilities);
        sink.set_result(report.message);
        sink.set_valid(report.is_valid);
    }

    /// Validate the editor's text and return the formatted outcome.
    pub fn evaluate(
        &self,
        editor: &dyn EditorText,
        capabilities: &Capabilities,
    ) -> ValidationReport {
        let now = (self.clock)();
        let version = capabilities.version();

        let outcome = editor
            .current_text()
            .and_then(|text| capabilities.validate_config(&text));

        match outcome {
            Ok(error) if error.is_empty() => ValidationReport {
                message: format_result(now, version, VALID_MESSAGE),
                is_valid: true,
            },
            Ok(error) => ValidationReport {
                message: format_result(now, version, &error),
                is_valid: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "validation call failed");
                ValidationReport {
                    message: format_result(now, version, &format!("Validation error: {e}")),
                    is_valid: false,
                }
            }
        }
    }
}

/// Format a result line.
pub fn format_result(time: NaiveTime, version: &str, body: &str) -> String {
    format!("{} | Xray Core {} | {}", time.format("%H:%M:%S"), version, body)
}
