//! Delimited-text options.

use std::path::PathBuf;

use dataexport_core::{C_DEFAULT_DATETIME_FORMAT, ExportError, Result};

/// Default field separator.
pub const C_DEFAULT_SEPARATOR: char = ',';
/// Default line terminator.
pub const C_DEFAULT_LINE_TERMINATOR: &str = "\n";

/// When cells are wrapped in double quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCsvQuoteRule {
    /// Plain join; cells are written as rendered.
    #[default]
    Never,
    /// Quote cells containing the separator, a quote or a line break.
    Minimal,
}

/// Options for [`crate::CsvWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCsvOptions {
    pub separator: char,
    pub line_terminator: String,
    pub quote_rule: EnumCsvQuoteRule,
    /// `chrono` pattern for date-time cells.
    pub datetime_format: String,
    /// Output file; nothing is persisted when `None`.
    pub path: Option<PathBuf>,
}

impl Default for SpecCsvOptions {
    fn default() -> Self {
        Self {
            separator: C_DEFAULT_SEPARATOR,
            line_terminator: C_DEFAULT_LINE_TERMINATOR.to_string(),
            quote_rule: EnumCsvQuoteRule::default(),
            datetime_format: C_DEFAULT_DATETIME_FORMAT.to_string(),
            path: None,
        }
    }
}

impl SpecCsvOptions {
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(self.separator, '"' | '\r' | '\n') {
            return Err(ExportError::invalid(format!(
                "Separator {:?} cannot delimit fields.",
                self.separator
            )));
        }
        if self.line_terminator.is_empty() {
            return Err(ExportError::invalid("Line terminator must not be empty."));
        }
        if let Some(path) = &self.path
            && path.as_os_str().is_empty()
        {
            return Err(ExportError::invalid("Output path must not be empty."));
        }
        dataexport_core::validate_datetime_format(&self.datetime_format)
    }
}
