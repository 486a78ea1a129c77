//! Table builder: one-level flattening of elements into typed rows.

use tracing::debug;

use crate::classify::EnumTypeClass;
use crate::schema::{ReflectCache, SpecMember};
use crate::spec::{
    EnumFormatHint, EnumLeafKind, ExportError, Result, SpecTableOptions,
};
use crate::value::{EnumLeafValue, EnumValue, ToExportValue};

////////////////////////////////////////////////////////////////////////////////
// #region OutputModel

/// Column descriptor, computed once per element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// `None` for the virtual column of a leaf-typed table.
    pub header: Option<String>,
    /// Source member; `None` for the virtual column.
    pub member_name: Option<String>,
    pub leaf_kind: EnumLeafKind,
    pub if_optional: bool,
    pub format_hint: EnumFormatHint,
}

/// Flat table: columns plus typed cells (`None` = empty cell).
#[derive(Debug, Clone, PartialEq)]
pub struct SpecOutputTable {
    /// Short name of the element type.
    pub type_name: String,
    pub columns: Vec<SpecColumn>,
    pub rows: Vec<Vec<Option<EnumLeafValue>>>,
    /// Non-leaf members left out of the column set.
    pub dropped_members: Vec<String>,
}

impl SpecOutputTable {
    /// `true` when a header line should be written.
    pub fn has_header(&self) -> bool {
        self.columns.iter().any(|col| col.header.is_some())
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|col| col.header.as_deref().unwrap_or(""))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cells as text; empty cells become empty strings.
    pub fn render_rows(&self, datetime_format: &str) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.as_ref()
                            .map(|val| val.render(datetime_format))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Builder

/// Build the table of `elements` with a fresh per-run cache.
pub fn build_table<T: ToExportValue>(
    elements: &[T],
    options: &SpecTableOptions,
) -> Result<SpecOutputTable> {
    let mut cache = ReflectCache::new();
    build_table_with_cache(elements, options, &mut cache)
}

/// Build the table of `elements`, reusing `cache`.
///
/// Leaf element types give one virtual column. Composite element types
/// give one column per leaf-typed member; other members are dropped and
/// listed in [`SpecOutputTable::dropped_members`].
pub fn build_table_with_cache<T: ToExportValue>(
    elements: &[T],
    options: &SpecTableOptions,
    cache: &mut ReflectCache,
) -> Result<SpecOutputTable> {
    for hint in options
        .format_hints
        .values()
        .chain(options.leaf_format_hint.iter())
    {
        hint.validate()?;
    }

    let desc = T::export_type();
    match cache.classify(&desc) {
        EnumTypeClass::Leaf { kind, if_optional } => {
            if !options.header_overrides.is_empty() || !options.format_hints.is_empty() {
                return Err(ExportError::invalid(format!(
                    "Element type {} has no members; use the leaf header and leaf format hint instead.",
                    desc.name()
                )));
            }
            let column = SpecColumn {
                header: options.leaf_header.clone(),
                member_name: None,
                leaf_kind: kind,
                if_optional,
                format_hint: options
                    .leaf_format_hint
                    .clone()
                    .unwrap_or_else(|| EnumFormatHint::infer(kind)),
            };
            let rows = elements
                .iter()
                .map(|element| vec![derive_cell(element.to_export_value(), options.if_trim)])
                .collect();

            Ok(SpecOutputTable {
                type_name: desc.name(),
                columns: vec![column],
                rows,
                dropped_members: Vec::new(),
            })
        }
        EnumTypeClass::Composite(composite) => {
            let schema = cache.members_of(&composite);

            let mut l_retained: Vec<(&SpecMember, EnumLeafKind, bool)> = Vec::new();
            let mut l_dropped: Vec<String> = Vec::new();
            for member in &schema.members {
                match cache.classify(&member.declared) {
                    EnumTypeClass::Leaf { kind, if_optional } => {
                        l_retained.push((member, kind, if_optional));
                    }
                    _ => l_dropped.push(member.name.clone()),
                }
            }

            for c_key in options
                .header_overrides
                .keys()
                .chain(options.format_hints.keys())
            {
                if l_retained.iter().any(|(m, _, _)| &m.name == c_key) {
                    continue;
                }
                let c_reason = if l_dropped.contains(c_key) {
                    "is not leaf-typed and has no column"
                } else {
                    "is not a member"
                };
                return Err(ExportError::invalid(format!(
                    "Column override {c_key:?} {c_reason} of {}.",
                    composite.full_name
                )));
            }

            let columns: Vec<SpecColumn> = l_retained
                .iter()
                .map(|(member, kind, if_optional)| SpecColumn {
                    header: Some(
                        options
                            .header_overrides
                            .get(&member.name)
                            .or(member.header.as_ref())
                            .unwrap_or(&member.name)
                            .clone(),
                    ),
                    member_name: Some(member.name.clone()),
                    leaf_kind: *kind,
                    if_optional: *if_optional,
                    format_hint: options
                        .format_hints
                        .get(&member.name)
                        .or(member.format_hint.as_ref())
                        .cloned()
                        .unwrap_or_else(|| EnumFormatHint::infer(*kind)),
                })
                .collect();

            let rows = elements
                .iter()
                .map(|element| match element.to_export_value() {
                    EnumValue::Object(obj) => l_retained
                        .iter()
                        .map(|(member, _, _)| {
                            derive_cell(member.get(obj.instance()), options.if_trim)
                        })
                        .collect::<Vec<_>>(),
                    _ => vec![None; l_retained.len()],
                })
                .collect();

            if !l_dropped.is_empty() {
                debug!(
                    type_name = composite.full_name,
                    dropped = ?l_dropped,
                    "non-leaf members left out of table"
                );
            }

            Ok(SpecOutputTable {
                type_name: composite.name.to_string(),
                columns,
                rows,
                dropped_members: l_dropped,
            })
        }
        EnumTypeClass::Sequence => Err(ExportError::invalid(format!(
            "Element type {} is a sequence and cannot be flattened into columns.",
            desc.name()
        ))),
    }
}

fn derive_cell(value: EnumValue, if_trim: bool) -> Option<EnumLeafValue> {
    match value {
        EnumValue::Leaf(leaf) if if_trim => leaf.trimmed(),
        EnumValue::Leaf(leaf) => Some(leaf),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
