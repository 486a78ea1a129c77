//! Export constants and default preset factories.

use crate::spec::{SpecTableOptions, SpecTreeOptions};

/// Label of the outermost tree node.
pub const C_DEFAULT_ROOT_LABEL: &str = "Root";
/// Default `chrono` pattern for date-time leaves.
pub const C_DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Prefix of sequence container labels (`Sequence_<Element>_`).
pub const C_SEQUENCE_LABEL_PREFIX: &str = "Sequence_";
/// Text rendering of `true`.
pub const C_BOOL_TRUE: &str = "True";
/// Text rendering of `false`.
pub const C_BOOL_FALSE: &str = "False";

/// Build default tree options.
pub fn derive_default_tree_options() -> SpecTreeOptions {
    SpecTreeOptions::default()
}

/// Build default table options (no trimming, no overrides).
pub fn derive_default_table_options() -> SpecTableOptions {
    SpecTableOptions::default()
}
