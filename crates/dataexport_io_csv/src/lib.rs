//! `dataexport_io_csv` v1:
//! Delimited-text writer over core output tables.
//!
//! - `spec`   : options and quoting rules
//! - `writer` : table → text, optional file output
pub mod spec;
pub mod writer;

pub use spec::{C_DEFAULT_SEPARATOR, EnumCsvQuoteRule, SpecCsvOptions};
pub use writer::{CsvWriter, to_csv};
