//! `dataexport_io_xlsx` v1:
//! Workbook writer over core output tables.
//!
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : formats, locale, options, post-write actions and reports
//! - `util`   : pure naming, slicing and cell-conversion helpers
//! - `writer` : workbook kernel, multi-sheet collection and viewer hook
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_DEFAULT_SHEET_NAME, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumPostWriteAction, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecLocaleFormats, SpecSheetSlice, SpecXlsxOutcome, SpecXlsxReport,
    SpecXlsxWriteOptions,
};
pub use util::{derive_column_letters, plan_sheet_slices, sanitize_sheet_name};
pub use writer::{
    SpecXlsxOutputItem, WorkbookViewer, XlsxOutputCollection, XlsxWriter, to_xlsx,
};
