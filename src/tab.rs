use log::{error, info, warn};

use banner_tables::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use chrono::Local;
use text_diff::print_diff;

use crate::args::Args;
use crate::tab::config_reader::*;
use crate::tab::export::*;
use crate::tab::io_common::read_dataset;

pub mod config_reader;
mod export;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Table {table_number}: invalid question configuration"))]
    ParsingQuestion {
        source: serde_json::Error,
        table_number: usize,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Excel file {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name:?} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Unsupported data file {path}: expected .csv, .xlsx, .xlsm, .xls or .ods"))]
    UnsupportedFormat { path: String },
    #[snafu(display("Invalid dataset in {path}"))]
    InvalidDataset { source: TableError, path: String },
    #[snafu(display("Error formatting the tables as CSV"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error writing output to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Table {table_number} could not be generated"))]
    Table {
        source: TableError,
        table_number: usize,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

/// The error followed by its causes, on one line.
pub fn error_chain(e: &TabError) -> String {
    let mut msg = e.to_string();
    let mut cause = std::error::Error::source(e);
    while let Some(c) = cause {
        msg.push_str(": ");
        msg.push_str(&c.to_string());
        cause = c.source();
    }
    msg
}

pub fn run(args: &Args) -> TabResult<()> {
    let settings = resolve_settings(args, Local::now().date_naive())?;
    info!("settings: {:?}", settings);

    let dataset = read_dataset(&settings.data_file, settings.excel_worksheet_name.as_deref())?;
    let questions = read_questions(&settings.questions_file)?;
    let banner = read_banner(&settings.banner_file);

    let records = generate_report(&dataset, &questions, &banner, &settings.header())?;
    let content = render_csv(&records)?;
    write_output(&settings.output, &content)?;

    // The reference tables, if provided for comparison
    if let Some(reference_p) = &args.reference {
        check_reference(reference_p, &content)?;
    }
    Ok(())
}

/// Generates the tables of all the questions, in order.
///
/// Questions are numbered from 1 in the order of the questions file. A
/// question that cannot be tabulated is reported and skipped; its number is
/// not reused.
pub fn generate_report(
    dataset: &Dataset,
    questions: &[TabResult<QuestionConfig>],
    banner: &[BannerSegment],
    header: &ReportHeader,
) -> TabResult<Vec<Vec<String>>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut failed: Vec<usize> = Vec::new();
    for (idx, question_r) in questions.iter().enumerate() {
        let table_number = idx + 1;
        let res = match question_r {
            Ok(question) => generate_crosstab(dataset, question, banner)
                .context(TableSnafu { table_number })
                .map(|table| (question, table)),
            Err(e) => {
                error!("{}", error_chain(e));
                failed.push(table_number);
                continue;
            }
        };
        match res {
            Ok((question, table)) => {
                records.extend(table_block(header, table_number, question, banner, &table));
            }
            Err(e) => {
                error!("{}", error_chain(&e));
                failed.push(table_number);
            }
        }
    }
    let generated = questions.len() - failed.len();
    info!("generate_report: {} tables generated", generated);
    if !failed.is_empty() {
        warn!("generate_report: tables not generated: {:?}", failed);
    }
    if generated == 0 {
        whatever!("No table could be generated from {} questions", questions.len())
    }
    Ok(records)
}

fn check_reference(reference_p: &str, content: &str) -> TabResult<()> {
    let reference = fs::read_to_string(reference_p).context(OpeningFileSnafu { path: reference_p })?;
    let reference = reference.replace("\r\n", "\n");
    if reference != content {
        warn!("Found differences with the reference tables");
        print_diff(reference.as_str(), content, "\n");
        whatever!("Difference detected between generated tables and reference tables")
    }
    info!("check_reference: output matches {}", reference_p);
    Ok(())
}
