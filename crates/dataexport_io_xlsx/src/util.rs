//! Pure XLSX helpers: naming, slicing and cell conversion.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDateTime;
use dataexport_core::{EnumFormatHint, EnumLeafValue, ExportError, Result, SpecColumn};

use crate::conf::{
    C_TABLE_NAME_PREFIX, N_EXCEL_SERIAL_UNIX_EPOCH, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_SECONDS_PER_DAY, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, EnumPostWriteAction, SpecSheetSlice, SpecXlsxReport};

////////////////////////////////////////////////////////////////////////////////
// #region HeaderUtils

/// Validate that `columns` has no duplicated names (case-insensitive, as
/// Excel table headers are).
pub fn validate_unique_columns(columns: &[&str]) -> Result<()> {
    let mut dict_pos: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name.to_lowercase()).or_default().push(n_idx);
    }
    if dict_pos.len() == columns.len() {
        return Ok(());
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(ExportError::invalid(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Spreadsheet column letters for a 1-based column number
/// (`1 → A`, `26 → Z`, `27 → AA`).
pub fn derive_column_letters(n_col_1based: usize) -> Result<String> {
    if n_col_1based == 0 {
        return Err(ExportError::invalid("Column numbers start at 1."));
    }
    let mut n_dividend = n_col_1based;
    let mut l_chars = Vec::new();
    while n_dividend > 0 {
        let n_modulo = (n_dividend - 1) % 26;
        l_chars.push(char::from(b'A' + n_modulo as u8));
        n_dividend = (n_dividend - n_modulo) / 26;
    }
    Ok(l_chars.iter().rev().collect())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Split a logical table range into Excel-compliant sheet slices.
///
/// `height_header` is 0 for header-less tables. A table without columns
/// still gets one (empty) slice.
pub fn plan_sheet_slices(
    height_table: usize,
    width_table: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>> {
    let n_rows_data_max = N_NROWS_EXCEL_MAX
        .checked_sub(height_header)
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            ExportError::invalid(format!(
                "Header too tall: height_header={height_header} exceeds Excel limit."
            ))
        })?;

    let mut l_col_slices = Vec::new();
    let mut n_col_start = 0;
    while n_col_start < width_table {
        let n_col_end = usize::min(width_table, n_col_start + N_NCOLS_EXCEL_MAX);
        l_col_slices.push((n_col_start, n_col_end));
        n_col_start = n_col_end;
    }
    if l_col_slices.is_empty() {
        l_col_slices.push((0, 0));
    }

    let mut l_row_slices = Vec::new();
    let mut n_row_start = 0;
    while n_row_start < height_table {
        let n_row_end = usize::min(height_table, n_row_start + n_rows_data_max);
        l_row_slices.push((n_row_start, n_row_end));
        n_row_start = n_row_end;
    }
    if l_row_slices.is_empty() {
        l_row_slices.push((0, 0));
    }

    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::new();
    let mut n_idx_part = 1;
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, n_idx_part)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
            });
            n_idx_part += 1;
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {} sheets (columns-first, then rows).",
            l_sheet_parts.len()
        ));
    }

    Ok(l_sheet_parts)
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// `Table_<TypeName>` with characters Excel rejects in table names
/// replaced by `_`.
pub fn derive_table_name(type_name: &str) -> String {
    let c_clean: String = type_name
        .chars()
        .map(|chr| {
            if chr.is_alphanumeric() || chr == '_' || chr == '.' {
                chr
            } else {
                '_'
            }
        })
        .collect();
    format!("{C_TABLE_NAME_PREFIX}{c_clean}")
}

/// First candidate of `base` (then `base_2`, `base_3`, ...) not in
/// `set_existing`, compared case-insensitively; the winner is recorded.
pub fn derive_unique_name(
    base: &str,
    n_len_max: usize,
    set_existing: &mut BTreeSet<String>,
) -> String {
    if set_existing.insert(base.to_lowercase()) {
        return base.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let c_suffix = format!("_{n_idx}");
        let c_base: String = base
            .chars()
            .take(usize::max(1, n_len_max.saturating_sub(c_suffix.len())))
            .collect();
        let candidate = format!("{c_base}{c_suffix}");
        if set_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellConversion

/// Serial day number of `dt` in the 1900 date system.
pub fn derive_excel_serial(dt: &NaiveDateTime) -> f64 {
    let dt_utc = dt.and_utc();
    let n_seconds =
        dt_utc.timestamp() as f64 + f64::from(dt_utc.timestamp_subsec_nanos()) / 1e9;
    N_EXCEL_SERIAL_UNIX_EPOCH + n_seconds / N_SECONDS_PER_DAY
}

/// Convert one table cell into the value written to the sheet.
///
/// Columns hinted as text keep every value as text; otherwise numbers,
/// decimals and date-times are written as numbers and booleans as logicals.
pub fn derive_cell_value(
    value: Option<&EnumLeafValue>,
    column: &SpecColumn,
    datetime_format: &str,
) -> EnumCellValue {
    let Some(value) = value else {
        return EnumCellValue::None;
    };
    if column.format_hint == EnumFormatHint::Text {
        return EnumCellValue::String(value.render(datetime_format));
    }
    match value {
        EnumLeafValue::Boolean(val) => EnumCellValue::Boolean(*val),
        EnumLeafValue::DateTime(val) => EnumCellValue::Number(derive_excel_serial(val)),
        other => match other.to_f64() {
            Some(n_val) if n_val.is_finite() => EnumCellValue::Number(n_val),
            _ => EnumCellValue::String(other.render(datetime_format)),
        },
    }
}

/// Display width with non-ASCII characters counted wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PostWriteUtils

/// Save actions need a non-empty target path.
pub fn validate_post_write_target(action: EnumPostWriteAction, path: Option<&Path>) -> Result<()> {
    if action.requires_path() && path.is_none_or(|p| p.as_os_str().is_empty()) {
        return Err(ExportError::invalid(format!(
            "The path cannot be missing or empty when the workbook is saved ({action})."
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use dataexport_core::{EnumLeafKind, SpecDecimal};

    use super::*;

    fn column(kind: EnumLeafKind, hint: EnumFormatHint) -> SpecColumn {
        SpecColumn {
            header: Some("C".to_string()),
            member_name: Some("C".to_string()),
            leaf_kind: kind,
            if_optional: false,
            format_hint: hint,
        }
    }

    #[test]
    fn column_letters_follow_bijective_base26() {
        assert_eq!(derive_column_letters(1).expect("A"), "A");
        assert_eq!(derive_column_letters(26).expect("Z"), "Z");
        assert_eq!(derive_column_letters(27).expect("AA"), "AA");
        assert_eq!(derive_column_letters(52).expect("AZ"), "AZ");
        assert_eq!(derive_column_letters(703).expect("AAA"), "AAA");
        assert_eq!(derive_column_letters(16_384).expect("XFD"), "XFD");
        assert!(derive_column_letters(0).is_err());
    }

    #[test]
    fn sheet_names_are_sanitized_and_capped() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn slices_split_rows_and_warn() {
        let mut report = SpecXlsxReport::default();
        let l_slices =
            plan_sheet_slices(N_NROWS_EXCEL_MAX + 5, 2, 1, "Data", &mut report).expect("plan");
        assert_eq!(l_slices.len(), 2);
        assert_eq!(l_slices[0].sheet_name, "Data_1");
        assert_eq!(l_slices[0].row_end_exclusive, N_NROWS_EXCEL_MAX - 1);
        assert_eq!(l_slices[1].row_start_inclusive, N_NROWS_EXCEL_MAX - 1);
        assert_eq!(report.warnings.len(), 1);

        let mut report = SpecXlsxReport::default();
        let l_slices = plan_sheet_slices(0, 0, 0, "Empty", &mut report).expect("plan");
        assert_eq!(l_slices.len(), 1);
        assert_eq!(l_slices[0].sheet_name, "Empty");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unique_names_ignore_case() {
        let mut set_names = BTreeSet::new();
        assert_eq!(derive_unique_name("Data", 31, &mut set_names), "Data");
        assert_eq!(derive_unique_name("data", 31, &mut set_names), "data_2");
        assert_eq!(derive_unique_name("Data", 31, &mut set_names), "Data_3");
    }

    #[test]
    fn duplicate_headers_are_reported() {
        assert!(validate_unique_columns(&["A", "B"]).is_ok());
        let err = validate_unique_columns(&["Name", "name", "B"]).expect_err("dup");
        assert!(err.to_string().contains("\"name\" x2"));
    }

    #[test]
    fn table_names_are_prefixed_and_cleaned() {
        assert_eq!(derive_table_name("Person"), "Table_Person");
        assert_eq!(derive_table_name("Pair<i32>"), "Table_Pair_i32_");
    }

    #[test]
    fn serials_match_the_1900_date_system() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("date");
        assert!((derive_excel_serial(&dt) - 45_292.5).abs() < 1e-9);
    }

    #[test]
    fn cells_follow_kind_and_hint() {
        let col_num = column(EnumLeafKind::Int32, EnumFormatHint::General);
        assert_eq!(
            derive_cell_value(Some(&EnumLeafValue::Int32(7)), &col_num, "%Y"),
            EnumCellValue::Number(7.0)
        );
        assert_eq!(derive_cell_value(None, &col_num, "%Y"), EnumCellValue::None);

        let col_text = column(EnumLeafKind::Int32, EnumFormatHint::Text);
        assert_eq!(
            derive_cell_value(Some(&EnumLeafValue::Int32(7)), &col_text, "%Y"),
            EnumCellValue::String("7".to_string())
        );

        let col_dec = column(EnumLeafKind::Decimal, EnumFormatHint::Currency);
        assert_eq!(
            derive_cell_value(
                Some(&EnumLeafValue::Decimal(SpecDecimal::new(1250, 2))),
                &col_dec,
                "%Y"
            ),
            EnumCellValue::Number(12.5)
        );

        let col_bool = column(EnumLeafKind::Boolean, EnumFormatHint::General);
        assert_eq!(
            derive_cell_value(Some(&EnumLeafValue::Boolean(true)), &col_bool, "%Y"),
            EnumCellValue::Boolean(true)
        );

        let col_nan = column(EnumLeafKind::Float64, EnumFormatHint::General);
        assert_eq!(
            derive_cell_value(Some(&EnumLeafValue::Float64(f64::NAN)), &col_nan, "%Y"),
            EnumCellValue::String("NaN".to_string())
        );
    }

    #[test]
    fn save_actions_need_a_path() {
        assert!(validate_post_write_target(EnumPostWriteAction::Open, None).is_ok());
        assert!(validate_post_write_target(EnumPostWriteAction::SaveAndClose, None).is_err());
        assert!(
            validate_post_write_target(EnumPostWriteAction::SaveAndView, Some(Path::new("")))
                .is_err()
        );
        assert!(
            validate_post_write_target(EnumPostWriteAction::SaveAndView, Some(Path::new("a.xlsx")))
                .is_ok()
        );
    }
}
