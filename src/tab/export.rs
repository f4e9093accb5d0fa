// Report layout and CSV output.

use crate::tab::*;

use chrono::NaiveDate;
use log::info;
use snafu::prelude::*;

use std::fs;
use std::io::Write;

/// Writing to this path sends the report to the standard output.
pub const STDOUT: &str = "stdout";

/// The study information printed above every table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportHeader {
    pub client_name: String,
    pub study_name: String,
    pub month: String,
    pub year: String,
}

pub fn default_output_name(study_name: &str, today: NaiveDate) -> String {
    format!(
        "{}_Output_Tables_{}.csv",
        study_name.replace(' ', "_"),
        today.format("%m%d%Y")
    )
}

/// The full block of one table in the report: the study and question
/// information, the banner labels and ids, then the rows of the table.
///
/// Every record has the width of the table.
pub fn table_block(
    header: &ReportHeader,
    table_number: usize,
    question: &QuestionConfig,
    banner: &[BannerSegment],
    table: &CrossTab,
) -> Vec<Vec<String>> {
    let width = table.width();
    let padded = |first: String| -> Vec<String> {
        let mut record = vec![String::new(); width];
        record[0] = first;
        record
    };
    let mut records: Vec<Vec<String>> = vec![
        padded(String::new()),
        padded("#page".to_string()),
        padded(header.client_name.clone()),
        padded(header.study_name.clone()),
        padded(format!("{} {}", header.month, header.year)),
        padded(format!("Table {}", table_number)),
        padded(question.question_text.clone()),
        padded(format!("Base: {}", question.base_text)),
        padded(String::new()),
    ];
    let mut labels = vec![String::new()];
    labels.extend(banner.iter().map(|seg| seg.label.clone()));
    records.push(labels);
    let mut ids = vec![String::new()];
    ids.extend(banner.iter().map(|seg| seg.id.clone()));
    records.push(ids);
    records.extend(table.to_records());
    records
}

/// Formats the records as CSV, without a header row.
pub fn render_csv(records: &[Vec<String>]) -> TabResult<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for record in records.iter() {
        wtr.write_record(record).context(WritingCsvSnafu {})?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(WritingOutputSnafu { path: "<memory>" })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_output(path: &str, content: &str) -> TabResult<()> {
    if path == STDOUT {
        let mut out = std::io::stdout();
        out.write_all(content.as_bytes())
            .context(WritingOutputSnafu { path })?;
    } else {
        fs::write(path, content).context(WritingOutputSnafu { path })?;
        info!("write_output: tables written to {}", path);
    }
    Ok(())
}
