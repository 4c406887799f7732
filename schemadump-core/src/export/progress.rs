//! Progress events emitted during an export run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of one progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Object exported successfully, or run-level status
    Info,
    /// One object failed; the export continues
    Warn,
    /// Setup failure; the export aborted
    Error,
}

impl Severity {
    /// Bracketed color tag used for direct terminal display.
    pub fn color_tag(self) -> &'static str {
        match self {
            Self::Info => "[green]",
            Self::Warn => "[yellow]",
            Self::Error => "[red]",
        }
    }
}

/// One unit of human-readable status text from a running export.
///
/// The stream of events is ordered per producer and closes when the export
/// reaches its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub severity: Severity,
    pub text: String,
}

impl ProgressEvent {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.severity.color_tag(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_color_tag() {
        assert_eq!(
            ProgressEvent::info("Exported TABLE: orders").to_string(),
            "[green]Exported TABLE: orders"
        );
        assert_eq!(
            ProgressEvent::warn("Failed to export VIEW: v1 - boom").to_string(),
            "[yellow]Failed to export VIEW: v1 - boom"
        );
        assert_eq!(
            ProgressEvent::error("Failed to open table file").to_string(),
            "[red]Failed to open table file"
        );
    }
}
