//! Delimited-text writer.

use std::fs;

use dataexport_core::{
    ExportError, Result, SpecOutputTable, SpecTableOptions, ToExportValue, build_table,
};
use tracing::info;

use crate::spec::{EnumCsvQuoteRule, SpecCsvOptions};

/// Joins table cells with a separator, one header line (when the table
/// has headers) then one line per row.
#[derive(Debug, Clone, Default)]
pub struct CsvWriter {
    options: SpecCsvOptions,
}

impl CsvWriter {
    pub fn new(options: SpecCsvOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &SpecCsvOptions {
        &self.options
    }

    /// Render `table` to text.
    pub fn render(&self, table: &SpecOutputTable) -> String {
        let mut c_out = String::new();
        if table.has_header() {
            let l_headers = table.headers();
            self.push_line(&mut c_out, l_headers.iter().copied());
        }
        for row in table.render_rows(&self.options.datetime_format) {
            self.push_line(&mut c_out, row.iter().map(String::as_str));
        }
        c_out
    }

    /// Render `table` and persist it when a path is configured.
    pub fn write(&self, table: &SpecOutputTable) -> Result<String> {
        let c_out = self.render(table);
        if let Some(path) = &self.options.path {
            fs::write(path, &c_out)
                .map_err(|e| ExportError::external(path.display().to_string(), e))?;
            info!(
                path = %path.display(),
                n_rows = table.height(),
                n_cols = table.width(),
                "wrote csv file"
            );
        }
        Ok(c_out)
    }

    fn push_line<'a>(&self, c_out: &mut String, cells: impl Iterator<Item = &'a str>) {
        let c_sep = self.options.separator.to_string();
        let l_cells: Vec<String> = cells.map(|cell| self.quote(cell)).collect();
        c_out.push_str(&l_cells.join(&c_sep));
        c_out.push_str(&self.options.line_terminator);
    }

    fn quote(&self, cell: &str) -> String {
        let if_needs_quotes = self.options.quote_rule == EnumCsvQuoteRule::Minimal
            && cell
                .chars()
                .any(|chr| chr == self.options.separator || matches!(chr, '"' | '\r' | '\n'));
        if if_needs_quotes {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.to_string()
        }
    }
}

/// Build the table of `elements` and write it as delimited text.
pub fn to_csv<T: ToExportValue>(
    elements: &[T],
    table_options: &SpecTableOptions,
    csv_options: &SpecCsvOptions,
) -> Result<String> {
    let writer = CsvWriter::new(csv_options.clone())?;
    let table = build_table(elements, table_options)?;
    writer.write(&table)
}
