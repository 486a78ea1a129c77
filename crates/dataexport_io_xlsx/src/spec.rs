//! Shared XLSX specification models.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use dataexport_core::{
    C_DEFAULT_DATETIME_FORMAT, EnumFormatHint, ExportError, Result, validate_datetime_format,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields leave the workbook default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Normalized cell value during the write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value (date-times as serials).
    Number(f64),
    /// Logical value.
    Boolean(bool),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LocaleFormats

/// Per-run locale pieces used to turn display hints into format codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLocaleFormats {
    /// Excel date pattern, e.g. `yyyy-mm-dd`.
    pub date_pattern: String,
    /// Excel time pattern, e.g. `hh:mm:ss`.
    pub time_pattern: String,
    pub currency_symbol: String,
    pub decimal_separator: String,
    pub group_separator: String,
}

impl Default for SpecLocaleFormats {
    fn default() -> Self {
        Self {
            date_pattern: "yyyy-mm-dd".to_string(),
            time_pattern: "hh:mm:ss".to_string(),
            currency_symbol: "$".to_string(),
            decimal_separator: ".".to_string(),
            group_separator: ",".to_string(),
        }
    }
}

impl SpecLocaleFormats {
    /// Date pattern followed by the time pattern.
    pub fn datetime_pattern(&self) -> String {
        format!("{} {}", self.date_pattern, self.time_pattern)
    }

    /// Format code for `hint`; `None` keeps the General format.
    pub fn number_format(&self, hint: &EnumFormatHint) -> Option<String> {
        let c_group = &self.group_separator;
        let c_dec = &self.decimal_separator;
        let c_sym = &self.currency_symbol;
        match hint {
            EnumFormatHint::General => None,
            EnumFormatHint::Text => Some("@".to_string()),
            EnumFormatHint::Number => Some("0".to_string()),
            EnumFormatHint::Date => Some(self.date_pattern.clone()),
            EnumFormatHint::DateTime => Some(self.datetime_pattern()),
            EnumFormatHint::Time => Some(self.time_pattern.clone()),
            EnumFormatHint::Currency => Some(format!("#{c_group}##0{c_dec}00 {c_sym}")),
            EnumFormatHint::Accounting => Some(format!(
                "_-* #{c_group}##0{c_dec}00 {c_sym}_-;-* #{c_group}##0{c_dec}00 {c_sym}_-;_-* \" - \"?? {c_sym}_-;_-@_-"
            )),
            EnumFormatHint::Custom(code) => Some(code.clone()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_pattern.trim().is_empty() || self.time_pattern.trim().is_empty() {
            return Err(ExportError::invalid(
                "Locale date and time patterns must not be empty.",
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for per-sheet writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

impl SpecAutofitCellsPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.width_cell_min == 0 {
            return Err(ExportError::invalid("policy_autofit.width_cell_min must be >= 1."));
        }
        if self.width_cell_max < self.width_cell_min {
            return Err(ExportError::invalid(
                "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.",
            ));
        }
        Ok(())
    }
}

/// Writer-wide options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Locale used for hint → format-code mapping.
    pub locale: SpecLocaleFormats,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Freeze the header row when one is written.
    pub if_freeze_header: bool,
    /// Lay an Excel table object over each written range.
    pub if_table_object: bool,
    /// Base patch merged into all body formats.
    pub base_format_patch: SpecCellFormat,
    /// strftime pattern for date-time cells written as text.
    pub datetime_format: String,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            locale: SpecLocaleFormats::default(),
            policy_autofit: SpecAutofitCellsPolicy::default(),
            if_freeze_header: true,
            if_table_object: true,
            base_format_patch: SpecCellFormat {
                border: Some(0),
                ..Default::default()
            },
            datetime_format: C_DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

impl SpecXlsxWriteOptions {
    pub fn validate(&self) -> Result<()> {
        self.locale.validate()?;
        self.policy_autofit.validate()?;
        validate_datetime_format(&self.datetime_format)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PostWriteSpecification

/// What happens to a workbook once every sheet is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPostWriteAction {
    /// Keep the workbook in memory and hand its bytes to the viewer.
    #[default]
    Open,
    /// Save to the path, then hand the path to the viewer.
    SaveAndView,
    /// Save to the path only.
    SaveAndClose,
}

impl EnumPostWriteAction {
    pub fn requires_path(self) -> bool {
        matches!(self, Self::SaveAndView | Self::SaveAndClose)
    }
}

impl fmt::Display for EnumPostWriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::SaveAndView => write!(f, "save_and_view"),
            Self::SaveAndClose => write!(f, "save_and_close"),
        }
    }
}

impl FromStr for EnumPostWriteAction {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "open" => Ok(Self::Open),
            "save_and_view" => Ok(Self::SaveAndView),
            "save_and_close" | "save" => Ok(Self::SaveAndClose),
            _ => Err(ExportError::invalid(format!(
                "Unknown post-write action: {s:?}."
            ))),
        }
    }
}

/// Result of a finished workbook export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxOutcome {
    /// Saved file, for save actions.
    pub path: Option<PathBuf>,
    /// Workbook bytes for `Open` when no viewer took them.
    pub buffer: Option<Vec<u8>>,
    /// One report per written table.
    pub reports: Vec<SpecXlsxReport>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Concrete sheet part emitted to workbook (after Excel-limit slicing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Inclusive source row start.
    pub row_start_inclusive: usize,
    /// Exclusive source row end.
    pub row_end_exclusive: usize,
    /// Inclusive source column start.
    pub col_start_inclusive: usize,
    /// Exclusive source column end.
    pub col_end_exclusive: usize,
}

/// Per-table write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet slices produced by the write call.
    pub sheets: Vec<SpecSheetSlice>,
    /// Table objects added, by name.
    pub tables: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_right_side_values() {
        let base = SpecCellFormat {
            font_name: Some("Calibri".to_string()),
            bold: Some(false),
            ..Default::default()
        };
        let merged = base.with_(SpecCellFormat {
            bold: Some(true),
            num_format: Some("0".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.font_name.as_deref(), Some("Calibri"));
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.num_format.as_deref(), Some("0"));
    }

    #[test]
    fn hints_map_to_locale_format_codes() {
        let locale = SpecLocaleFormats {
            currency_symbol: "€".to_string(),
            decimal_separator: ",".to_string(),
            group_separator: ".".to_string(),
            date_pattern: "dd.mm.yyyy".to_string(),
            time_pattern: "hh:mm:ss".to_string(),
        };
        assert_eq!(locale.number_format(&EnumFormatHint::General), None);
        assert_eq!(locale.number_format(&EnumFormatHint::Text).as_deref(), Some("@"));
        assert_eq!(locale.number_format(&EnumFormatHint::Number).as_deref(), Some("0"));
        assert_eq!(
            locale.number_format(&EnumFormatHint::DateTime).as_deref(),
            Some("dd.mm.yyyy hh:mm:ss")
        );
        assert_eq!(
            locale.number_format(&EnumFormatHint::Currency).as_deref(),
            Some("#.##0,00 €")
        );
        assert_eq!(
            locale.number_format(&EnumFormatHint::Accounting).as_deref(),
            Some("_-* #.##0,00 €_-;-* #.##0,00 €_-;_-* \" - \"?? €_-;_-@_-")
        );
        assert_eq!(
            locale
                .number_format(&EnumFormatHint::Custom("0.000".to_string()))
                .as_deref(),
            Some("0.000")
        );
    }

    #[test]
    fn post_write_actions_parse_and_flag_paths() {
        assert_eq!(
            "save-and-view".parse::<EnumPostWriteAction>().expect("parse"),
            EnumPostWriteAction::SaveAndView
        );
        assert!(EnumPostWriteAction::SaveAndClose.requires_path());
        assert!(!EnumPostWriteAction::Open.requires_path());
        assert!("print".parse::<EnumPostWriteAction>().is_err());
    }

    #[test]
    fn autofit_policy_bounds_are_checked() {
        let policy = SpecAutofitCellsPolicy {
            width_cell_min: 10,
            width_cell_max: 5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(SpecXlsxWriteOptions::default().validate().is_ok());
    }

    #[test]
    fn write_options_reject_offset_datetime_format() {
        let options = SpecXlsxWriteOptions {
            datetime_format: "%z".to_string(),
            ..SpecXlsxWriteOptions::default()
        };
        assert!(matches!(options.validate(), Err(ExportError::InvalidInput(_))));
    }
}
