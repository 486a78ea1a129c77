//! XML rendering options.

use std::path::PathBuf;

use dataexport_core::{ExportError, Result};

/// Declared encoding; the only one the renderer emits.
pub const C_XML_ENCODING_UTF8: &str = "UTF-8";
/// XML version written in the declaration.
pub const C_XML_VERSION: &str = "1.0";

/// Options for [`crate::XmlWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXmlOptions {
    /// Encoding label of the declaration.
    pub encoding: String,
    /// Pretty-print with `n_indent` spaces per level.
    pub if_indent: bool,
    pub n_indent: usize,
    /// Output file; nothing is persisted when `None`.
    pub path: Option<PathBuf>,
}

impl Default for SpecXmlOptions {
    fn default() -> Self {
        Self {
            encoding: C_XML_ENCODING_UTF8.to_string(),
            if_indent: true,
            n_indent: 2,
            path: None,
        }
    }
}

impl SpecXmlOptions {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_indent(mut self, if_indent: bool) -> Self {
        self.if_indent = if_indent;
        self
    }

    /// Accepts the UTF-8 label in its usual spellings.
    pub fn validate(&self) -> Result<()> {
        let c_norm = self.encoding.trim().to_ascii_uppercase().replace('_', "-");
        if c_norm != "UTF-8" && c_norm != "UTF8" {
            return Err(ExportError::invalid(format!(
                "Unsupported XML encoding {:?}; only UTF-8 is written.",
                self.encoding
            )));
        }
        if let Some(path) = &self.path
            && path.as_os_str().is_empty()
        {
            return Err(ExportError::invalid("Output path must not be empty."));
        }
        Ok(())
    }
}
