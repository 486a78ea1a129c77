//! Element-name and CDATA helpers.

use dataexport_core::{ExportError, Result};
use regex::Regex;

const C_PATTERN_NAME_INVALID: &str = r"[^A-Za-z0-9_.\-]";

/// Compile the matcher for characters not allowed in element names.
pub fn derive_name_invalid_regex() -> Result<Regex> {
    Regex::new(C_PATTERN_NAME_INVALID)
        .map_err(|e| ExportError::invalid(format!("Invalid element-name pattern: {e}")))
}

/// Map a logical node name onto a valid XML element name.
///
/// Disallowed characters become `_`; names not starting with a letter
/// or `_` get a leading `_`.
pub fn sanitize_element_name(re_invalid: &Regex, name: &str) -> String {
    let c_clean = re_invalid.replace_all(name.trim(), "_");
    match c_clean.chars().next() {
        Some(chr) if chr.is_ascii_alphabetic() || chr == '_' => c_clean.into_owned(),
        _ => format!("_{c_clean}"),
    }
}

/// Split `text` into CDATA-safe chunks; `]]>` never appears in one chunk.
pub fn split_cdata(text: &str) -> Vec<String> {
    let l_parts: Vec<&str> = text.split("]]>").collect();
    let n_last = l_parts.len() - 1;
    l_parts
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            let c_head = if idx > 0 { ">" } else { "" };
            let c_tail = if idx < n_last { "]]" } else { "" };
            format!("{c_head}{part}{c_tail}")
        })
        .collect()
}
