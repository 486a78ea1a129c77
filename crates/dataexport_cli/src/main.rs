//! `dataexport` demo command line.
//!
//! Writes a small order/customer graph (with a referral cycle) as CSV,
//! XML or an XLSX workbook.
//!
//! ```bash
//! dataexport csv --separator ';' --trim
//! dataexport xml --output orders.xml
//! dataexport xlsx --action save-and-close --output orders.xlsx
//! RUST_LOG=debug dataexport xlsx
//! ```

mod demo;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dataexport_core::{
    EnumFormatHint, SpecTableOptions, SpecTreeOptions, derive_default_table_options,
    derive_default_tree_options,
};
use dataexport_io_csv::{EnumCsvQuoteRule, SpecCsvOptions, to_csv};
use dataexport_io_xlsx::{
    EnumPostWriteAction, SpecLocaleFormats, SpecXlsxOutputItem, WorkbookViewer,
    XlsxOutputCollection, conf::derive_default_xlsx_write_options,
};
use dataexport_io_xml::{SpecXmlOptions, to_xml};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::demo::{Order, derive_demo_orders, release_demo_orders};

#[derive(Parser)]
#[command(name = "dataexport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export a sample object graph as CSV, XML or XLSX")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show per-run introspection logs
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Flatten the orders into delimited text
    Csv(CsvArgs),
    /// Write the full order graph as an XML document
    Xml(XmlArgs),
    /// Write orders and customers into one workbook
    Xlsx(XlsxArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Output file; stdout when omitted (csv, xml)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// strftime pattern for date-time values
    #[arg(long, default_value = dataexport_core::C_DEFAULT_DATETIME_FORMAT)]
    datetime_format: String,
}

#[derive(Args)]
struct CsvArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Field separator
    #[arg(short, long, default_value_t = ',')]
    separator: char,

    /// Trim string cells
    #[arg(long)]
    trim: bool,

    /// Quote cells containing the separator, quotes or line breaks
    #[arg(long)]
    quote: bool,
}

#[derive(Args)]
struct XmlArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Label of the outermost element
    #[arg(long, default_value = dataexport_core::C_DEFAULT_ROOT_LABEL)]
    root_label: String,

    /// Write the document on one line
    #[arg(long)]
    no_indent: bool,
}

#[derive(Args)]
struct XlsxArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// What to do with the finished workbook
    #[arg(short, long, value_enum, default_value = "save-and-close")]
    action: ActionArg,

    /// Worksheet name for the orders
    #[arg(long, default_value = dataexport_io_xlsx::C_DEFAULT_SHEET_NAME)]
    sheet: String,

    /// Trim string cells
    #[arg(long)]
    trim: bool,

    /// Currency symbol used by currency-formatted columns
    #[arg(long, default_value = "$")]
    currency_symbol: String,

    /// Display format of the amount column (general, number, currency, custom:<code>, ...)
    #[arg(long)]
    amount_format: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    Open,
    SaveAndView,
    SaveAndClose,
}

impl From<ActionArg> for EnumPostWriteAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Open => EnumPostWriteAction::Open,
            ActionArg::SaveAndView => EnumPostWriteAction::SaveAndView,
            ActionArg::SaveAndClose => EnumPostWriteAction::SaveAndClose,
        }
    }
}

/// Logs what a desktop viewer would be asked to show.
struct LogViewer;

impl WorkbookViewer for LogViewer {
    fn view_buffer(&mut self, v_workbook: Vec<u8>) -> dataexport_core::Result<()> {
        info!(n_bytes = v_workbook.len(), "workbook ready to view (unsaved)");
        Ok(())
    }

    fn view_path(&mut self, path: &Path) -> dataexport_core::Result<()> {
        info!(path = %path.display(), "workbook ready to view");
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let c_out = run(&cli.command)?;
    if !c_out.is_empty() {
        print!("{c_out}");
    }
    Ok(())
}

/// Run one subcommand; returns text for stdout (empty when written to a file).
fn run(command: &Command) -> Result<String> {
    let l_orders = derive_demo_orders();
    let result = match command {
        Command::Csv(args) => run_csv(&l_orders, args),
        Command::Xml(args) => run_xml(&l_orders, args),
        Command::Xlsx(args) => run_xlsx(&l_orders, args),
    };
    release_demo_orders(&l_orders);
    result
}

fn run_csv(orders: &[Rc<Order>], args: &CsvArgs) -> Result<String> {
    let table_options = derive_default_table_options().with_trim(args.trim);
    let mut csv_options = SpecCsvOptions::default().with_separator(args.separator);
    csv_options.datetime_format = args.common.datetime_format.clone();
    if args.quote {
        csv_options.quote_rule = EnumCsvQuoteRule::Minimal;
    }
    if let Some(path) = &args.common.output {
        csv_options = csv_options.with_path(path);
    }

    let c_doc = to_csv(orders, &table_options, &csv_options).context("csv export failed")?;
    Ok(if args.common.output.is_some() {
        String::new()
    } else {
        c_doc
    })
}

fn run_xml(orders: &[Rc<Order>], args: &XmlArgs) -> Result<String> {
    let mut tree_options: SpecTreeOptions = derive_default_tree_options();
    tree_options.root_label = args.root_label.clone();
    tree_options.datetime_format = args.common.datetime_format.clone();
    let mut xml_options = SpecXmlOptions::default().with_indent(!args.no_indent);
    if let Some(path) = &args.common.output {
        xml_options = xml_options.with_path(path);
    }

    let l_orders = orders.to_vec();
    let c_doc = to_xml(&l_orders, &tree_options, &xml_options).context("xml export failed")?;
    Ok(if args.common.output.is_some() {
        String::new()
    } else {
        c_doc
    })
}

fn run_xlsx(orders: &[Rc<Order>], args: &XlsxArgs) -> Result<String> {
    let mut table_options: SpecTableOptions = derive_default_table_options().with_trim(args.trim);
    if let Some(c_format) = &args.amount_format {
        let hint: EnumFormatHint = c_format.parse().context("invalid --amount-format")?;
        table_options = table_options.with_format("Amount", hint);
    }

    let mut write_options = derive_default_xlsx_write_options();
    write_options.locale = SpecLocaleFormats {
        currency_symbol: args.currency_symbol.clone(),
        ..SpecLocaleFormats::default()
    };
    write_options.datetime_format = args.common.datetime_format.clone();

    let l_customers: Vec<_> = orders.iter().map(|o| Rc::clone(&o.customer)).collect();
    let mut collection =
        XlsxOutputCollection::new(args.action.into(), args.common.output.clone())
            .with_write_options(write_options);
    collection.add(SpecXlsxOutputItem::from_elements(
        orders,
        args.sheet.as_str(),
        &table_options,
    )?)?;
    collection.add(SpecXlsxOutputItem::from_elements(
        &l_customers,
        "Customers",
        &derive_default_table_options().with_trim(args.trim),
    )?)?;

    let mut viewer = LogViewer;
    let outcome = collection
        .export(Some(&mut viewer))
        .context("xlsx export failed")?;
    for report in &outcome.reports {
        for slice in &report.sheets {
            info!(
                sheet = %slice.sheet_name,
                n_rows = slice.row_end_exclusive - slice.row_start_inclusive,
                "sheet written"
            );
        }
    }
    Ok(String::new())
}
