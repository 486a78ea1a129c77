//! XLSX writer kernel that turns output tables into workbook sheets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dataexport_core::{
    EnumFormatHint, EnumLeafKind, EnumLeafValue, ExportError, Result, SpecColumn,
    SpecOutputTable, SpecTableOptions, ToExportValue, build_table,
};
use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, Table, TableColumn, Workbook, Worksheet, XlsxError,
};
use tracing::{debug, info, warn};

use crate::conf::{EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, derive_default_xlsx_formats};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumPostWriteAction, SpecCellFormat, SpecSheetSlice,
    SpecXlsxOutcome, SpecXlsxReport, SpecXlsxWriteOptions,
};
use crate::util::{
    derive_cell_value, derive_column_letters, derive_table_name, derive_unique_name,
    estimate_unicode_string_width, plan_sheet_slices, sanitize_sheet_name,
    validate_post_write_target, validate_unique_columns,
};

/// Excel table name maximum length.
const N_LEN_TABLE_NAME_MAX: usize = 255;

////////////////////////////////////////////////////////////////////////////////
// #region Writer

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::save`] or
/// [`Self::save_to_buffer`] is called; no sheet can be added after that.
pub struct XlsxWriter {
    workbook: Workbook,
    fmt_body: SpecCellFormat,
    fmt_header: SpecCellFormat,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    set_table_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
    saved_path: Option<PathBuf>,
}

impl XlsxWriter {
    /// Create a writer with the default format presets.
    pub fn new(write_options: SpecXlsxWriteOptions) -> Result<Self> {
        write_options.validate()?;
        let mut dict_fmt = derive_default_xlsx_formats();
        Ok(Self {
            workbook: Workbook::new(),
            fmt_body: dict_fmt.remove(&EnumFmtKey::Body).unwrap_or_default(),
            fmt_header: dict_fmt.remove(&EnumFmtKey::Header).unwrap_or_default(),
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            set_table_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
            saved_path: None,
        })
    }

    /// Replace the body and header presets.
    pub fn with_formats(mut self, fmt_body: SpecCellFormat, fmt_header: SpecCellFormat) -> Self {
        self.fmt_body = fmt_body;
        self.fmt_header = fmt_header;
        self
    }

    /// Return immutable snapshot of per-table write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to `path`. Saving again to the same path is a no-op.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if self.if_closed {
            if self.saved_path.as_deref() == Some(path) {
                return Ok(());
            }
            return Err(ExportError::invalid(format!(
                "Workbook is already closed; nothing was written to {}.",
                path.display()
            )));
        }
        self.workbook
            .save(path)
            .map_err(|e| ExportError::external(path.display().to_string(), e))?;
        self.if_closed = true;
        self.saved_path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            n_sheets = self.set_sheet_names_existing.len(),
            "wrote xlsx file"
        );
        Ok(())
    }

    /// Serialize the workbook to bytes and close it.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        if self.if_closed {
            return Err(ExportError::invalid("Workbook is already closed."));
        }
        let v_workbook = self.workbook.save_to_buffer().map_err(derive_xlsx_error)?;
        self.if_closed = true;
        debug!(n_bytes = v_workbook.len(), "serialized xlsx workbook");
        Ok(v_workbook)
    }

    /// Write `table` to one or more sheets named after `sheet_name`.
    pub fn write_table(&mut self, table: &SpecOutputTable, sheet_name: &str) -> Result<()> {
        if self.if_closed {
            return Err(ExportError::invalid("Cannot write after save()."));
        }

        let policy_autofit = self.write_options.policy_autofit.clone();
        let c_datetime_format = self.write_options.datetime_format.clone();
        let if_header = table.has_header();
        let l_headers = table.headers();
        if if_header && self.write_options.if_table_object {
            validate_unique_columns(&l_headers)?;
        }
        let n_rows_header = usize::from(if_header);

        let mut report = SpecXlsxReport::default();
        let l_sheet_parts = plan_sheet_slices(
            table.height(),
            table.width(),
            n_rows_header,
            &sanitize_sheet_name(sheet_name, "_"),
            &mut report,
        )?;

        let l_num_format_by_col: Vec<Option<String>> = table
            .columns
            .iter()
            .map(|col| self.derive_column_num_format(col))
            .collect();
        let l_fmt_data_by_col: Vec<Format> = l_num_format_by_col
            .iter()
            .map(|c_num_format| {
                let fmt_col = self
                    .fmt_body
                    .merge(&self.write_options.base_format_patch)
                    .with_(SpecCellFormat {
                        num_format: c_num_format.clone(),
                        ..Default::default()
                    });
                derive_rust_xlsx_format(&fmt_col)
            })
            .collect();
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);

        let if_autofit_columns = !matches!(
            policy_autofit.rule_columns,
            EnumAutofitColumnsRule::None
        );

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique = derive_unique_name(
                &sheet_slice.sheet_name,
                N_LEN_EXCEL_SHEET_NAME_MAX,
                &mut self.set_sheet_names_existing,
            );
            let worksheet = self.workbook.add_worksheet();
            worksheet
                .set_name(&sheet_name_unique)
                .map_err(derive_xlsx_error)?;

            let n_col_start = sheet_slice.col_start_inclusive;
            let n_cols = sheet_slice.col_end_exclusive - n_col_start;
            let n_rows_data = sheet_slice.row_end_exclusive - sheet_slice.row_start_inclusive;

            let mut l_width_by_col_header = vec![0usize; n_cols];
            let mut l_width_by_col_body = vec![0usize; n_cols];

            if if_header {
                let l_headers_slice = &l_headers[n_col_start..n_col_start + n_cols];
                write_header(worksheet, l_headers_slice, &fmt_header)?;
                for (n_idx_col, c_header) in l_headers_slice.iter().enumerate() {
                    l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_header);
                }
                if self.write_options.if_freeze_header {
                    worksheet
                        .set_freeze_panes(1, 0)
                        .map_err(derive_xlsx_error)?;
                }
            }

            let l_rows =
                &table.rows[sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive];
            for (n_row_local, row) in l_rows.iter().enumerate() {
                let if_measure_row = if_autofit_columns
                    && policy_autofit
                        .height_body_inferred_max
                        .is_none_or(|n_max| n_row_local < n_max);

                for n_idx_col in 0..n_cols {
                    let n_idx_col_abs = n_col_start + n_idx_col;
                    let column = &table.columns[n_idx_col_abs];
                    let leaf = row[n_idx_col_abs].as_ref();

                    if if_measure_row {
                        l_width_by_col_body[n_idx_col] = usize::max(
                            l_width_by_col_body[n_idx_col],
                            estimate_width_len(
                                leaf,
                                l_num_format_by_col[n_idx_col_abs].as_deref(),
                                &c_datetime_format,
                            ),
                        );
                    }

                    let value = derive_cell_value(leaf, column, &c_datetime_format);
                    write_cell_with_format(
                        worksheet,
                        n_rows_header + n_row_local,
                        n_idx_col,
                        &value,
                        &l_fmt_data_by_col[n_idx_col_abs],
                    )?;
                }
            }

            if if_autofit_columns && n_cols > 0 {
                let n_min = usize::max(1, policy_autofit.width_cell_min);
                let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
                let n_pad = policy_autofit.width_cell_padding;

                for n_idx_col in 0..n_cols {
                    let n_width_recorded = match policy_autofit.rule_columns {
                        EnumAutofitColumnsRule::Header => l_width_by_col_header[n_idx_col],
                        EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                        EnumAutofitColumnsRule::All | EnumAutofitColumnsRule::None => usize::max(
                            l_width_by_col_header[n_idx_col],
                            l_width_by_col_body[n_idx_col],
                        ),
                    };
                    let n_width_final =
                        usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                    worksheet
                        .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
                        .map_err(derive_xlsx_error)?;
                }
            }

            let n_rows_written = n_rows_header + n_rows_data;
            if self.write_options.if_table_object && n_rows_data > 0 && n_cols > 0 {
                let c_table_name = derive_unique_name(
                    &derive_table_name(&table.type_name),
                    N_LEN_TABLE_NAME_MAX,
                    &mut self.set_table_names_existing,
                );
                let mut xl_table = Table::new()
                    .set_name(c_table_name.as_str())
                    .set_header_row(if_header);
                if if_header {
                    let l_table_columns: Vec<TableColumn> = l_headers
                        [n_col_start..n_col_start + n_cols]
                        .iter()
                        .map(|c_header| {
                            TableColumn::new()
                                .set_header(*c_header)
                                .set_header_format(fmt_header.clone())
                        })
                        .collect();
                    xl_table = xl_table.set_columns(&l_table_columns);
                }
                worksheet
                    .add_table(
                        0,
                        0,
                        cast_row_num(n_rows_written - 1)?,
                        cast_col_num(n_cols - 1)?,
                        &xl_table,
                    )
                    .map_err(derive_xlsx_error)?;
                report.tables.push(c_table_name);
            }

            if n_cols > 0 && n_rows_written > 0 {
                let c_range = format!("A1:{}{n_rows_written}", derive_column_letters(n_cols)?);
                debug!(sheet = %sheet_name_unique, range = %c_range, "wrote xlsx sheet");
            }

            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..sheet_slice
            });
        }

        for c_warning in &report.warnings {
            warn!(sheet = sheet_name, "{c_warning}");
        }
        self.l_reports.push(report);
        Ok(())
    }

    /// Number format of a column; date-time columns without one still get
    /// the locale pattern so serials display as dates.
    fn derive_column_num_format(&self, column: &SpecColumn) -> Option<String> {
        let locale = &self.write_options.locale;
        locale.number_format(&column.format_hint).or_else(|| {
            (column.leaf_kind == EnumLeafKind::DateTime
                && column.format_hint != EnumFormatHint::Text)
                .then(|| locale.datetime_pattern())
        })
    }
}

/// Estimate displayed width units for one cell.
fn estimate_width_len(
    value: Option<&EnumLeafValue>,
    c_num_format: Option<&str>,
    datetime_format: &str,
) -> usize {
    match (value, c_num_format) {
        (None, _) => 0,
        (Some(EnumLeafValue::DateTime(_)), Some(c_pattern)) => c_pattern.chars().count(),
        (Some(val), _) => estimate_unicode_string_width(&val.render(datetime_format)),
    }
}

fn write_header(worksheet: &mut Worksheet, headers: &[&str], fmt_header: &Format) -> Result<()> {
    for (col_idx, cell_value) in headers.iter().enumerate() {
        if cell_value.is_empty() {
            worksheet
                .write_blank(0, cast_col_num(col_idx)?, fmt_header)
                .map_err(derive_xlsx_error)?;
        } else {
            worksheet
                .write_string_with_format(0, cast_col_num(col_idx)?, *cell_value, fmt_header)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| ExportError::invalid(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| ExportError::invalid(format!("column index overflow: {value}")))
}

fn derive_xlsx_error(err: XlsxError) -> ExportError {
    ExportError::external("xlsx workbook", err)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OutputCollection

/// Receives a finished workbook for display.
pub trait WorkbookViewer {
    /// Unsaved workbook bytes (`Open`).
    fn view_buffer(&mut self, v_workbook: Vec<u8>) -> Result<()>;
    /// Saved workbook file (`SaveAndView`).
    fn view_path(&mut self, path: &Path) -> Result<()>;
}

/// One worksheet worth of data.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecXlsxOutputItem {
    pub table: SpecOutputTable,
    pub sheet_name: String,
}

impl SpecXlsxOutputItem {
    pub fn new(table: SpecOutputTable, sheet_name: impl Into<String>) -> Self {
        Self {
            table,
            sheet_name: sheet_name.into(),
        }
    }

    /// Build the table of `elements`; trimming follows `table_options`.
    pub fn from_elements<T: ToExportValue>(
        elements: &[T],
        sheet_name: impl Into<String>,
        table_options: &SpecTableOptions,
    ) -> Result<Self> {
        Ok(Self::new(build_table(elements, table_options)?, sheet_name))
    }
}

/// Several tables bound for one workbook, plus what to do with it.
#[derive(Debug, Clone, Default)]
pub struct XlsxOutputCollection {
    items: Vec<SpecXlsxOutputItem>,
    post_action: EnumPostWriteAction,
    path: Option<PathBuf>,
    write_options: SpecXlsxWriteOptions,
}

impl XlsxOutputCollection {
    pub fn new(post_action: EnumPostWriteAction, path: Option<PathBuf>) -> Self {
        Self {
            post_action,
            path,
            ..Self::default()
        }
    }

    pub fn with_write_options(mut self, write_options: SpecXlsxWriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    pub fn post_action(&self) -> EnumPostWriteAction {
        self.post_action
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Add one item; worksheet names are unique ignoring case.
    pub fn add(&mut self, item: SpecXlsxOutputItem) -> Result<()> {
        if self.contains(&item.sheet_name) {
            return Err(ExportError::invalid(format!(
                "Worksheet name {:?} already exists in this workbook.",
                item.sheet_name
            )));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = SpecXlsxOutputItem>) -> Result<()> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    pub fn contains(&self, sheet_name: &str) -> bool {
        let c_key = sheet_name.to_lowercase();
        self.items
            .iter()
            .any(|item| item.sheet_name.to_lowercase() == c_key)
    }

    pub fn remove(&mut self, sheet_name: &str) -> Option<SpecXlsxOutputItem> {
        let c_key = sheet_name.to_lowercase();
        let n_idx = self
            .items
            .iter()
            .position(|item| item.sheet_name.to_lowercase() == c_key)?;
        Some(self.items.remove(n_idx))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecXlsxOutputItem> {
        self.items.iter()
    }

    /// Write every item to one workbook, then apply the post-write action.
    ///
    /// The save target is checked before the workbook is created.
    pub fn export(&self, viewer: Option<&mut dyn WorkbookViewer>) -> Result<SpecXlsxOutcome> {
        validate_post_write_target(self.post_action, self.path.as_deref())?;

        let mut writer = XlsxWriter::new(self.write_options.clone())?;
        for item in &self.items {
            writer.write_table(&item.table, &item.sheet_name)?;
        }
        let reports = writer.report();

        match (self.post_action, self.path.as_deref()) {
            (EnumPostWriteAction::Open, _) => {
                let v_workbook = writer.save_to_buffer()?;
                let buffer = match viewer {
                    Some(viewer) => {
                        viewer.view_buffer(v_workbook)?;
                        None
                    }
                    None => Some(v_workbook),
                };
                Ok(SpecXlsxOutcome {
                    path: None,
                    buffer,
                    reports,
                })
            }
            (action, Some(path)) => {
                writer.save(path)?;
                if action == EnumPostWriteAction::SaveAndView {
                    match viewer {
                        Some(viewer) => viewer.view_path(path)?,
                        None => debug!(path = %path.display(), "no workbook viewer attached"),
                    }
                }
                Ok(SpecXlsxOutcome {
                    path: Some(path.to_path_buf()),
                    buffer: None,
                    reports,
                })
            }
            (action, None) => Err(ExportError::invalid(format!(
                "The path cannot be missing when the workbook is saved ({action})."
            ))),
        }
    }
}

/// Build the table of `elements` and export it as a one-sheet workbook.
pub fn to_xlsx<T: ToExportValue>(
    elements: &[T],
    sheet_name: &str,
    table_options: &SpecTableOptions,
    post_action: EnumPostWriteAction,
    path: Option<PathBuf>,
    viewer: Option<&mut dyn WorkbookViewer>,
) -> Result<SpecXlsxOutcome> {
    validate_post_write_target(post_action, path.as_deref())?;
    let mut collection = XlsxOutputCollection::new(post_action, path);
    collection.add(SpecXlsxOutputItem::from_elements(
        elements,
        sheet_name,
        table_options,
    )?)?;
    collection.export(viewer)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chrono::NaiveDate;
    use dataexport_core::{Exportable, SpecSchema};

    use super::*;

    struct Item {
        id: u32,
        label: String,
        at: chrono::NaiveDateTime,
        parent: Option<Rc<Item>>,
    }

    impl Exportable for Item {
        const TYPE_NAME: &'static str = "Item";
        const TYPE_FULL_NAME: &'static str = "tests::Item";

        fn schema() -> SpecSchema {
            SpecSchema::builder::<Self>()
                .property("Id", |i: &Item| i.id)
                .property("Label", |i: &Item| i.label.clone())
                .property("At", |i: &Item| i.at)
                .property("Parent", |i: &Item| i.parent.clone())
                .build()
        }
    }

    #[derive(Default)]
    struct RecordingViewer {
        n_bytes: Option<usize>,
        path: Option<PathBuf>,
    }

    impl WorkbookViewer for RecordingViewer {
        fn view_buffer(&mut self, v_workbook: Vec<u8>) -> Result<()> {
            self.n_bytes = Some(v_workbook.len());
            Ok(())
        }

        fn view_path(&mut self, path: &Path) -> Result<()> {
            self.path = Some(path.to_path_buf());
            Ok(())
        }
    }

    fn items() -> Vec<Rc<Item>> {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .expect("date");
        let first = Rc::new(Item {
            id: 1,
            label: " first ".to_string(),
            at,
            parent: None,
        });
        let second = Rc::new(Item {
            id: 2,
            label: "second".to_string(),
            at,
            parent: Some(Rc::clone(&first)),
        });
        vec![first, second]
    }

    #[test]
    fn open_returns_workbook_bytes_without_viewer() {
        let outcome = to_xlsx(
            &items(),
            "Items",
            &SpecTableOptions::default().with_trim(true),
            EnumPostWriteAction::Open,
            None,
            None,
        )
        .expect("xlsx");

        let v_workbook = outcome.buffer.expect("buffer");
        assert!(v_workbook.starts_with(b"PK"));
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].sheets[0].sheet_name, "Items");
        assert_eq!(outcome.reports[0].tables, vec!["Table_Item".to_string()]);
    }

    #[test]
    fn open_hands_bytes_to_viewer() {
        let mut viewer = RecordingViewer::default();
        let outcome = to_xlsx(
            &[1i32, 2, 3],
            "Numbers",
            &SpecTableOptions::default(),
            EnumPostWriteAction::Open,
            None,
            Some(&mut viewer),
        )
        .expect("xlsx");
        assert!(outcome.buffer.is_none());
        assert!(viewer.n_bytes.is_some_and(|n| n > 0));
        assert_eq!(outcome.reports[0].tables, vec!["Table_i32".to_string()]);
    }

    #[test]
    fn save_and_view_writes_file_then_views_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.xlsx");
        let mut viewer = RecordingViewer::default();

        let outcome = to_xlsx(
            &items(),
            "Items",
            &SpecTableOptions::default(),
            EnumPostWriteAction::SaveAndView,
            Some(path.clone()),
            Some(&mut viewer),
        )
        .expect("xlsx");

        assert_eq!(outcome.path.as_deref(), Some(path.as_path()));
        assert_eq!(viewer.path.as_deref(), Some(path.as_path()));
        assert!(viewer.n_bytes.is_none());
        let v_file = std::fs::read(&path).expect("read back");
        assert!(v_file.starts_with(b"PK"));
    }

    #[test]
    fn save_without_path_fails_before_writing() {
        let mut viewer = RecordingViewer::default();
        let err = to_xlsx(
            &items(),
            "Items",
            &SpecTableOptions::default(),
            EnumPostWriteAction::SaveAndClose,
            None,
            Some(&mut viewer),
        )
        .expect_err("missing path");
        assert!(matches!(err, ExportError::InvalidInput(_)));
        assert!(viewer.n_bytes.is_none() && viewer.path.is_none());

        let collection =
            XlsxOutputCollection::new(EnumPostWriteAction::SaveAndView, Some(PathBuf::new()));
        assert!(matches!(
            collection.export(None),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn collection_rejects_duplicate_sheet_names() {
        let mut collection = XlsxOutputCollection::new(EnumPostWriteAction::Open, None);
        let item = SpecXlsxOutputItem::from_elements(&[1u8], "Data", &SpecTableOptions::default())
            .expect("item");
        collection.add(item.clone()).expect("first");
        let err = collection
            .add(SpecXlsxOutputItem::new(item.table.clone(), "DATA"))
            .expect_err("duplicate");
        assert!(matches!(err, ExportError::InvalidInput(_)));
        assert_eq!(collection.len(), 1);
        assert!(collection.remove("data").is_some());
        assert!(collection.is_empty());
    }

    #[test]
    fn collection_writes_one_sheet_per_item_with_unique_tables() {
        let mut collection = XlsxOutputCollection::new(EnumPostWriteAction::Open, None);
        collection
            .extend([
                SpecXlsxOutputItem::from_elements(&items(), "First", &SpecTableOptions::default())
                    .expect("first"),
                SpecXlsxOutputItem::from_elements(
                    &items(),
                    "Second",
                    &SpecTableOptions::default().with_header("Label", "Name"),
                )
                .expect("second"),
            ])
            .expect("extend");

        let outcome = collection.export(None).expect("export");
        let l_tables: Vec<&str> = outcome
            .reports
            .iter()
            .flat_map(|r| r.tables.iter().map(String::as_str))
            .collect();
        assert_eq!(l_tables, vec!["Table_Item", "Table_Item_2"]);
        let l_sheets: Vec<&str> = collection.iter().map(|i| i.sheet_name.as_str()).collect();
        assert_eq!(l_sheets, vec!["First", "Second"]);
    }

    #[test]
    fn empty_table_gets_sheet_but_no_table_object() {
        let l_empty: Vec<Rc<Item>> = Vec::new();
        let outcome = to_xlsx(
            &l_empty,
            "Empty",
            &SpecTableOptions::default(),
            EnumPostWriteAction::Open,
            None,
            None,
        )
        .expect("xlsx");
        assert_eq!(outcome.reports[0].sheets.len(), 1);
        assert!(outcome.reports[0].tables.is_empty());
    }

    #[test]
    fn duplicate_headers_are_rejected_for_table_objects() {
        let table = build_table(
            &items(),
            &SpecTableOptions::default()
                .with_header("Id", "Key")
                .with_header("Label", "key"),
        )
        .expect("table");
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        assert!(matches!(
            writer.write_table(&table, "Data"),
            Err(ExportError::InvalidInput(_))
        ));

        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions {
            if_table_object: false,
            ..SpecXlsxWriteOptions::default()
        })
        .expect("writer");
        writer.write_table(&table, "Data").expect("plain range");
        assert!(writer.report()[0].tables.is_empty());
    }

    #[test]
    fn sheet_names_are_sanitized_and_deduplicated() {
        let table = build_table(&[1.5f64], &SpecTableOptions::default()).expect("table");
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        writer.write_table(&table, "a/b").expect("first");
        writer.write_table(&table, "A_B").expect("second");

        let l_reports = writer.report();
        assert_eq!(l_reports[0].sheets[0].sheet_name, "a_b");
        assert_eq!(l_reports[1].sheets[0].sheet_name, "A_B_2");
        assert_eq!(l_reports[1].tables, vec!["Table_f64_2".to_string()]);
    }

    #[test]
    fn writing_after_save_is_rejected() {
        let table = build_table(&[true], &SpecTableOptions::default()).expect("table");
        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        writer.write_table(&table, "Flags").expect("write");
        let v_workbook = writer.save_to_buffer().expect("buffer");
        assert!(!v_workbook.is_empty());
        assert!(writer.write_table(&table, "More").is_err());
        assert!(writer.save_to_buffer().is_err());
    }

    #[test]
    fn save_after_buffer_reports_nothing_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flags.xlsx");
        let table = build_table(&[true], &SpecTableOptions::default()).expect("table");

        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        writer.write_table(&table, "Flags").expect("write");
        writer.save_to_buffer().expect("buffer");
        assert!(matches!(
            writer.save(&path),
            Err(ExportError::InvalidInput(_))
        ));
        assert!(!path.exists());

        let mut writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        writer.write_table(&table, "Flags").expect("write");
        writer.save(&path).expect("save");
        writer.save(&path).expect("same path again");
        assert!(writer.save(&dir.path().join("other.xlsx")).is_err());
    }

    #[test]
    fn text_datetime_cells_use_run_format() {
        let options = SpecXlsxWriteOptions {
            datetime_format: "%d.%m.%Y".to_string(),
            ..SpecXlsxWriteOptions::default()
        };
        let at = items()[0].at;
        let value = EnumLeafValue::DateTime(at);
        assert_eq!(estimate_width_len(Some(&value), None, &options.datetime_format), 10);

        let table = build_table(
            &items(),
            &SpecTableOptions::default().with_format("At", EnumFormatHint::Text),
        )
        .expect("table");
        let mut writer = XlsxWriter::new(options).expect("writer");
        writer.write_table(&table, "Items").expect("write");
        assert!(writer.save_to_buffer().expect("buffer").starts_with(b"PK"));

        let err = XlsxWriter::new(SpecXlsxWriteOptions {
            datetime_format: "%Y %Z".to_string(),
            ..SpecXlsxWriteOptions::default()
        })
        .err();
        assert!(matches!(err, Some(ExportError::InvalidInput(_))));
    }

    #[test]
    fn datetime_columns_default_to_locale_pattern() {
        let writer = XlsxWriter::new(SpecXlsxWriteOptions::default()).expect("writer");
        let table = build_table(&items(), &SpecTableOptions::default()).expect("table");
        let column = &table.columns[2];
        assert_eq!(
            writer.derive_column_num_format(column).as_deref(),
            Some("yyyy-mm-dd hh:mm:ss")
        );

        let column_general = SpecColumn {
            format_hint: EnumFormatHint::General,
            ..column.clone()
        };
        assert_eq!(
            writer.derive_column_num_format(&column_general).as_deref(),
            Some("yyyy-mm-dd hh:mm:ss")
        );
        assert_eq!(writer.derive_column_num_format(&table.columns[0]), None);
    }
}
