// ********* Respondent data ***********

use std::collections::HashMap;

use log::debug;
use snafu::ensure;

use crate::config::*;
use crate::filter::Filter;

/// Columns that identify respondents or carry dates and markers. They keep
/// their text content when the dataset is converted to numbers.
pub const EXCLUDED_COLUMNS: [&str; 4] = ["date", "markers", "record", "uuid"];

/// The content of one cell of the respondent data.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Checked indicator of a multi select option.
    pub fn is_checked(&self) -> bool {
        matches!(self, Cell::Number(x) if *x == 1.0)
    }

    fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }

    /// Equality against a display structure code.
    ///
    /// Values of the same native type are compared directly. When the types
    /// differ (a numeric column and a text code, or the reverse), both sides
    /// are compared through their text rendering.
    pub fn matches_code(&self, code: &CodeValue) -> bool {
        match (self, code) {
            (Cell::Missing, _) => false,
            (Cell::Number(x), CodeValue::Int(i)) => *x == *i as f64,
            (Cell::Number(x), CodeValue::Float(f)) => *x == *f,
            (Cell::Text(s), CodeValue::Text(t)) => s == t,
            (Cell::Number(x), CodeValue::Text(t)) => canonical_number(*x) == *t,
            (Cell::Text(s), c) => *s == c.canonical_text(),
        }
    }

    fn to_numeric(&self) -> Cell {
        match self {
            Cell::Number(x) if x.is_nan() => Cell::Missing,
            Cell::Number(x) => Cell::Number(*x),
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(x) if !x.is_nan() => Cell::Number(x),
                _ => Cell::Missing,
            },
            Cell::Missing => Cell::Missing,
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        if x.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(x)
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(x: Option<f64>) -> Self {
        x.map(Cell::from).unwrap_or(Cell::Missing)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// A named column of the respondent data.
#[derive(PartialEq, Debug, Clone)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: &str, cells: Vec<Cell>) -> Column {
        Column {
            name: name.to_string(),
            cells,
        }
    }

    /// A numeric column; `None` is a missing value.
    pub fn numeric(name: &str, values: &[Option<f64>]) -> Column {
        Column::new(name, values.iter().map(|v| Cell::from(*v)).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Respondent-level data: one row per respondent, columns addressed by
/// variable name.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
    num_rows: usize,
}

impl Dataset {
    /// All the columns must have the same length and distinct names.
    pub fn new(columns: Vec<Column>) -> TableResult<Dataset> {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (idx, c) in columns.iter().enumerate() {
            ensure!(
                c.len() == num_rows,
                RaggedColumnSnafu {
                    column: c.name.clone(),
                    expected: num_rows,
                    found: c.len(),
                }
            );
            ensure!(
                positions.insert(c.name.clone(), idx).is_none(),
                DuplicateColumnSnafu {
                    column: c.name.clone()
                }
            );
        }
        Ok(Dataset {
            columns,
            positions,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).cloned()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Panics if the indexes are out of bounds.
    pub fn cell(&self, row: usize, col_idx: usize) -> &Cell {
        &self.columns[col_idx].cells[row]
    }

    /// A view over every respondent.
    pub fn all_rows(&self) -> Subset<'_> {
        Subset {
            dataset: self,
            rows: (0..self.num_rows).collect(),
        }
    }
}

/// Normalizes the data before tabulation.
///
/// In every column outside `excluded`, empty and whitespace-only cells become
/// missing and all the other cells are converted to numbers. Cells that are
/// not numbers become missing as well. The shape of the dataset is unchanged.
pub fn clean_blank_and_convert_to_numeric(dataset: &mut Dataset, excluded: &[&str]) {
    for column in dataset.columns.iter_mut() {
        if excluded.contains(&column.name.as_str()) {
            continue;
        }
        let mut coerced = 0;
        for cell in column.cells.iter_mut() {
            let was_text = matches!(cell, Cell::Text(_));
            *cell = if cell.is_blank() {
                Cell::Missing
            } else {
                cell.to_numeric()
            };
            if was_text && cell.is_missing() {
                coerced += 1;
            }
        }
        if coerced > 0 {
            debug!(
                "clean_blank_and_convert_to_numeric: column {:?}: {} cells without a number",
                column.name, coerced
            );
        }
    }
}

/// A selection of respondents of a dataset.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> Subset<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps the respondents for which the filter holds.
    pub fn filter(&self, filter: &Filter) -> TableResult<Subset<'a>> {
        let mut rows: Vec<usize> = Vec::new();
        for row in self.rows.iter() {
            if filter.matches(self.dataset, *row)? {
                rows.push(*row);
            }
        }
        Ok(Subset {
            dataset: self.dataset,
            rows,
        })
    }

    /// The cells of one column for the selected respondents.
    pub fn cells(&self, col_idx: usize) -> impl Iterator<Item = &'a Cell> + '_ {
        let dataset = self.dataset;
        self.rows.iter().map(move |row| dataset.cell(*row, col_idx))
    }

    pub fn count_where<F: Fn(&Cell) -> bool>(&self, col_idx: usize, pred: F) -> u64 {
        self.cells(col_idx).filter(|c| pred(*c)).count() as u64
    }

    /// The numeric values of a column, missing values skipped.
    pub fn numbers(&self, col_idx: usize) -> Vec<f64> {
        self.cells(col_idx).filter_map(|c| c.as_number()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "record",
                vec![Cell::from("1"), Cell::from(" "), Cell::from("3")],
            ),
            Column::new(
                "Q1",
                vec![Cell::from("1"), Cell::from("  "), Cell::from("abc")],
            ),
            Column::new(
                "Q2",
                vec![Cell::from(" 2.5 "), Cell::from(""), Cell::Number(4.0)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn cleaner_converts_non_excluded_columns() {
        let mut ds = raw_dataset();
        clean_blank_and_convert_to_numeric(&mut ds, &EXCLUDED_COLUMNS);
        assert_eq!(ds.num_rows(), 3);
        assert_eq!(ds.num_columns(), 3);
        assert_eq!(
            ds.column("Q1").unwrap().cells(),
            &[Cell::Number(1.0), Cell::Missing, Cell::Missing]
        );
        assert_eq!(
            ds.column("Q2").unwrap().cells(),
            &[Cell::Number(2.5), Cell::Missing, Cell::Number(4.0)]
        );
        // Identifier columns keep their text, blanks included.
        assert_eq!(
            ds.column("record").unwrap().cells(),
            &[Cell::from("1"), Cell::from(" "), Cell::from("3")]
        );
    }

    #[test]
    fn cleaner_is_idempotent() {
        let mut ds = raw_dataset();
        clean_blank_and_convert_to_numeric(&mut ds, &EXCLUDED_COLUMNS);
        let once = ds.clone();
        clean_blank_and_convert_to_numeric(&mut ds, &EXCLUDED_COLUMNS);
        assert_eq!(ds, once);
    }

    #[test]
    fn dataset_rejects_ragged_columns() {
        let res = Dataset::new(vec![
            Column::numeric("a", &[Some(1.0), Some(2.0)]),
            Column::numeric("b", &[Some(1.0)]),
        ]);
        assert!(matches!(res, Err(TableError::RaggedColumn { .. })));
    }

    #[test]
    fn dataset_rejects_duplicate_columns() {
        let res = Dataset::new(vec![
            Column::numeric("a", &[Some(1.0)]),
            Column::numeric("a", &[Some(2.0)]),
        ]);
        assert!(matches!(res, Err(TableError::DuplicateColumn { .. })));
    }

    #[test]
    fn code_matching_falls_back_to_text() {
        assert!(Cell::Number(1.0).matches_code(&CodeValue::Int(1)));
        assert!(Cell::Number(1.0).matches_code(&CodeValue::Text("1".to_string())));
        assert!(Cell::from("2").matches_code(&CodeValue::Int(2)));
        assert!(Cell::from("a").matches_code(&CodeValue::Text("a".to_string())));
        assert!(!Cell::Number(1.5).matches_code(&CodeValue::Text("1".to_string())));
        assert!(!Cell::Missing.matches_code(&CodeValue::Int(1)));
    }

    #[test]
    fn nan_is_missing() {
        assert_eq!(Cell::from(f64::NAN), Cell::Missing);
        assert_eq!(Cell::from("NaN").to_numeric(), Cell::Missing);
    }

    #[test]
    fn subset_counts() {
        let ds = Dataset::new(vec![Column::numeric(
            "A",
            &[Some(1.0), Some(0.0), None, Some(1.0)],
        )])
        .unwrap();
        let all = ds.all_rows();
        assert_eq!(all.len(), 4);
        assert_eq!(all.count_where(0, |c| c.is_checked()), 2);
        assert_eq!(all.numbers(0), vec![1.0, 0.0, 1.0]);
    }
}
