// Primitives for reading CSV files.

use std::io;

use banner_tables::builder::DatasetBuilder;
use csv::Reader;
use log::{debug, info};
use snafu::prelude::*;

use crate::tab::*;

pub fn read_csv_dataset(path: &str) -> TabResult<Dataset> {
    info!("read_csv_dataset: reading {:?}", path);
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    read_records(rdr, path)
}

/// The first line holds the variable names. Empty fields are missing values.
pub fn read_records<R: io::Read>(mut rdr: Reader<R>, path: &str) -> TabResult<Dataset> {
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { path, lineno: 1usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_records: header: {:?}", header);

    let mut builder = DatasetBuilder::new(&header);
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let fields: Vec<&str> = line.iter().collect();
        builder
            .add_record(&fields)
            .context(InvalidDatasetSnafu { path })?;
    }
    debug!("read_records: {} rows", builder.num_rows());
    builder.build().context(InvalidDatasetSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_str(data: &str) -> TabResult<Dataset> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        read_records(rdr, "inline.csv")
    }

    #[test]
    fn reads_header_and_fields() {
        let ds = read_str("record,S1,S2\n1001,1,\n1002, ,34\n").unwrap();
        assert_eq!(ds.column_names(), vec!["record", "S1", "S2"]);
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.cell(0, 2), &Cell::Missing);
        assert_eq!(ds.cell(1, 1), &Cell::from(" "));
    }

    #[test]
    fn ragged_lines_are_errors() {
        let res = read_str("a,b\n1,2\n3\n");
        assert!(matches!(
            res,
            Err(TabError::CsvLineParse { lineno: 3, .. })
        ));
    }

    #[test]
    fn duplicate_names_are_errors() {
        let res = read_str("a,a\n1,2\n");
        assert!(matches!(res, Err(TabError::InvalidDataset { .. })));
    }

    #[test]
    fn identifier_columns_in_conditions() {
        let mut ds = read_str("record,S1\n1001,1\n1002,2\n1003,1\n").unwrap();
        clean_blank_and_convert_to_numeric(&mut ds, &EXCLUDED_COLUMNS);
        let question = QuestionConfig::single("S1", vec![DisplayRow::code("Yes", 1)]);
        let banner = vec![
            BannerSegment::new("A", "First", Some("record == 1001")),
            BannerSegment::new("B", "Later", Some("record > 1001")),
        ];
        let table = generate_crosstab(&ds, &question, &banner).unwrap();
        assert_eq!(
            table.row("Base").unwrap(),
            &[TableCell::text("Base"), TableCell::Count(1), TableCell::Count(2)]
        );
    }

    #[test]
    fn header_only() {
        let ds = read_str("a,b\n").unwrap();
        assert_eq!(ds.num_rows(), 0);
        assert_eq!(ds.num_columns(), 2);
    }
}
