//! `dataexport_core` v1:
//! Shape-agnostic export engine shared by the CSV, XML and XLSX writers.
//!
//! Architecture:
//! - `conf`     : constants and default presets
//! - `spec`     : type descriptors, hints, options and errors
//! - `value`    : runtime value model and conversions
//! - `schema`   : member enumerator and per-run reflection cache
//! - `classify` : leaf / composite / sequence classifier
//! - `guard`    : ancestor chain for cycle detection
//! - `tree`     : recursive tree builder
//! - `table`    : one-level table builder
//! - `util`     : pure string and parsing helpers
pub mod classify;
pub mod conf;
pub mod guard;
pub mod schema;
pub mod spec;
pub mod table;
pub mod tree;
pub mod util;
pub mod value;

pub use classify::{EnumTypeClass, classify_type, is_leaf};
pub use conf::{
    C_DEFAULT_DATETIME_FORMAT, C_DEFAULT_ROOT_LABEL, derive_default_table_options,
    derive_default_tree_options,
};
pub use guard::SpecCycleGuard;
pub use schema::{Exportable, ReflectCache, SpecMember, SpecSchema, SpecSchemaBuilder, members_of};
pub use spec::{
    EnumFormatHint, EnumLeafKind, EnumMemberRole, EnumTypeDesc, ExportError, Result,
    SpecCompositeType, SpecNamedType, SpecTableOptions, SpecTreeOptions,
};
pub use table::{SpecColumn, SpecOutputTable, build_table, build_table_with_cache};
pub use tree::{
    EnumNodeContent, EnumNodeKind, SpecOutputNode, build_tree, build_tree_from_value,
};
pub use util::{
    left, pad_left, pad_right, parse_bool, parse_value, right, to_trimmed_string,
    validate_datetime_format,
};
pub use value::{
    EnumLeafValue, EnumValue, Fingerprint, SharedSeq, SpecDecimal, SpecObjectRef,
    SpecSequenceValue, ToExportValue,
};
