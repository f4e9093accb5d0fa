use crate::tab::io_csv::read_csv_dataset;
use crate::tab::io_excel::read_excel_dataset;
use crate::tab::*;

use log::info;
use std::path::Path;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DataFormat {
    Csv,
    Excel,
}

/// The format of a data file, from its extension.
pub fn data_format(path: &Path) -> TabResult<DataFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(DataFormat::Csv),
        Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(DataFormat::Excel),
        _ => UnsupportedFormatSnafu {
            path: path.to_string_lossy(),
        }
        .fail(),
    }
}

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Reads the respondent data and prepares it for tabulation.
pub fn read_dataset(path: &Path, worksheet_name: Option<&str>) -> TabResult<Dataset> {
    let path_s = path.to_string_lossy().to_string();
    let mut dataset = match data_format(path)? {
        DataFormat::Csv => read_csv_dataset(&path_s)?,
        DataFormat::Excel => read_excel_dataset(&path_s, worksheet_name)?,
    };
    clean_blank_and_convert_to_numeric(&mut dataset, &EXCLUDED_COLUMNS);
    info!(
        "read_dataset: {}: {} respondents, {} columns",
        simplify_file_name(path),
        dataset.num_rows(),
        dataset.num_columns()
    );
    Ok(dataset)
}
