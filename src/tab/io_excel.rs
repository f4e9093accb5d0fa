// Primitives for reading spreadsheets.

use banner_tables::builder::DatasetBuilder;
use calamine::{open_workbook_auto, DataType, Reader};
use log::{debug, info};
use snafu::prelude::*;

use crate::tab::*;

/// Reads a worksheet: the first row holds the variable names, the following
/// rows the respondents.
pub fn read_excel_dataset(path: &str, worksheet_name: Option<&str>) -> TabResult<Dataset> {
    info!(
        "read_excel_dataset: reading {:?} (worksheet {:?})",
        path, worksheet_name
    );
    let mut workbook = open_workbook_auto(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    }
    .context(OpeningExcelSnafu { path })?;

    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_name(idx, cell))
        .collect();
    debug!("read_excel_dataset: header: {:?}", header);

    let mut builder = DatasetBuilder::new(&header);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(read_cell_calamine).collect();
        builder
            .add_row(cells)
            .context(InvalidDatasetSnafu { path })?;
    }
    debug!("read_excel_dataset: {} rows", builder.num_rows());
    builder.build().context(InvalidDatasetSnafu { path })
}

// Unnamed columns get a positional name.
fn header_name(idx: usize, cell: &DataType) -> String {
    match cell {
        DataType::String(s) if !s.trim().is_empty() => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => CodeValue::Float(*f).canonical_text(),
        _ => format!("Unnamed: {}", idx),
    }
}

fn read_cell_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::from(*f),
        DataType::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        // Serial date number
        DataType::DateTime(f) => Cell::Number(*f),
        DataType::String(s) => Cell::Text(s.clone()),
        // Empty cells and cell errors
        _ => Cell::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell_calamine(&DataType::Int(3)), Cell::Number(3.0));
        assert_eq!(read_cell_calamine(&DataType::Float(2.5)), Cell::Number(2.5));
        assert_eq!(read_cell_calamine(&DataType::Bool(true)), Cell::Number(1.0));
        assert_eq!(
            read_cell_calamine(&DataType::String(" ".to_string())),
            Cell::from(" ")
        );
        assert_eq!(read_cell_calamine(&DataType::Empty), Cell::Missing);
    }

    #[test]
    fn header_names() {
        assert_eq!(header_name(0, &DataType::String("S1".to_string())), "S1");
        assert_eq!(header_name(3, &DataType::Empty), "Unnamed: 3");
        assert_eq!(header_name(1, &DataType::Float(2.0)), "2");
    }

    #[test]
    fn reads_the_fixture() {
        let dataset = read_excel_dataset("tests/data/data.xlsx", None).unwrap();
        assert_eq!(dataset.num_rows(), 6);
        assert_eq!(
            dataset.column_names(),
            vec!["record", "uuid", "S1", "S2", "Q5_1", "Q5_2", "Q5_3", "Q7"]
        );
        assert_eq!(dataset.column("S2").unwrap().cells()[0], Cell::Number(25.0));
        assert_eq!(dataset.column("Q7").unwrap().cells()[2], Cell::Missing);
        assert_eq!(dataset.column("Q7").unwrap().cells()[5], Cell::from("abc"));
    }

    #[test]
    fn named_worksheet() {
        assert!(read_excel_dataset("tests/data/data.xlsx", Some("Data")).is_ok());
        assert!(matches!(
            read_excel_dataset("tests/data/data.xlsx", Some("Sheet9")),
            Err(TabError::MissingWorksheet { .. })
        ));
    }
}
