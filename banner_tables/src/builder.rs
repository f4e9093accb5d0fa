use snafu::ensure;

pub use crate::config::*;
use crate::dataset::{Cell, Column, Dataset};

/// A builder for assembling a dataset row by row.
///
/// Readers of delimited files and spreadsheets produce respondents one at a
/// time; the builder turns them into columns.
///
/// ```
/// use banner_tables::builder::DatasetBuilder;
/// use banner_tables::{Cell, TableError};
///
/// let mut builder = DatasetBuilder::new(&["record".to_string(), "S1".to_string()]);
/// builder.add_record(&["1001", "2"])?;
/// builder.add_row(vec![Cell::from("1002"), Cell::Missing])?;
///
/// let dataset = builder.build()?;
/// assert_eq!(dataset.num_rows(), 2);
/// assert_eq!(dataset.column("S1").unwrap().cells()[0], Cell::from("2"));
/// # Ok::<(), TableError>(())
/// ```
pub struct DatasetBuilder {
    names: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DatasetBuilder {
    pub fn new(columns: &[String]) -> DatasetBuilder {
        DatasetBuilder {
            names: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Adds a respondent. The row must have one cell per declared column.
    pub fn add_row(&mut self, row: Vec<Cell>) -> TableResult<()> {
        ensure!(
            row.len() == self.names.len(),
            RaggedRowSnafu {
                row: self.rows.len() + 1,
                expected: self.names.len(),
                found: row.len(),
            }
        );
        self.rows.push(row);
        Ok(())
    }

    /// Adds a respondent from raw text fields.
    ///
    /// Empty fields are missing values; everything else is kept as text until
    /// the dataset is cleaned.
    pub fn add_record<S: AsRef<str>>(&mut self, record: &[S]) -> TableResult<()> {
        let row = record
            .iter()
            .map(|field| match field.as_ref() {
                "" => Cell::Missing,
                s => Cell::from(s),
            })
            .collect();
        self.add_row(row)
    }

    pub fn build(self) -> TableResult<Dataset> {
        let mut columns: Vec<Vec<Cell>> = self
            .names
            .iter()
            .map(|_| Vec::with_capacity(self.rows.len()))
            .collect();
        for row in self.rows.into_iter() {
            for (col, cell) in columns.iter_mut().zip(row.into_iter()) {
                col.push(cell);
            }
        }
        let columns: Vec<Column> = self
            .names
            .iter()
            .zip(columns.into_iter())
            .map(|(name, cells)| Column::new(name, cells))
            .collect();
        Dataset::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let mut builder = DatasetBuilder::new(&["a".to_string(), "b".to_string()]);
        builder.add_record(&["1", "2"]).unwrap();
        let res = builder.add_record(&["3"]);
        assert!(matches!(
            res,
            Err(TableError::RaggedRow {
                row: 2,
                expected: 2,
                found: 1
            })
        ));
        assert_eq!(builder.num_rows(), 1);
    }

    #[test]
    fn empty_builder() {
        let dataset = DatasetBuilder::new(&["a".to_string()]).build().unwrap();
        assert_eq!(dataset.num_rows(), 0);
        assert_eq!(dataset.column_names(), vec!["a"]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let builder = DatasetBuilder::new(&["a".to_string(), "a".to_string()]);
        assert!(matches!(
            builder.build(),
            Err(TableError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn empty_fields_are_missing() {
        let mut builder = DatasetBuilder::new(&["a".to_string(), "b".to_string()]);
        builder.add_record(&["", " "]).unwrap();
        let dataset = builder.build().unwrap();
        assert_eq!(dataset.cell(0, 0), &Cell::Missing);
        assert_eq!(dataset.cell(0, 1), &Cell::from(" "));
    }
}
