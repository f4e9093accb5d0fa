// ********* Input data structures ***********

use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::Snafu;

use crate::filter::ParseError;

/// A category code or a column name, as written in a display structure.
///
/// Single choice questions use numeric codes (`1`, `2`, ...) although text
/// codes are accepted. Multi select questions name their indicator columns.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CodeValue {
    /// The value rendered the way it is compared when the native types
    /// of a cell and of a code differ.
    pub fn canonical_text(&self) -> String {
        match self {
            CodeValue::Int(i) => i.to_string(),
            CodeValue::Float(f) => canonical_number(*f),
            CodeValue::Text(s) => s.clone(),
        }
    }

    pub fn as_column_name(&self) -> Option<&str> {
        match self {
            CodeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Display for CodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_text())
    }
}

impl From<i64> for CodeValue {
    fn from(i: i64) -> Self {
        CodeValue::Int(i)
    }
}

impl From<i32> for CodeValue {
    fn from(i: i32) -> Self {
        CodeValue::Int(i as i64)
    }
}

impl From<f64> for CodeValue {
    fn from(f: f64) -> Self {
        CodeValue::Float(f)
    }
}

impl From<&str> for CodeValue {
    fn from(s: &str) -> Self {
        CodeValue::Text(s.to_string())
    }
}

/// Integral numbers are written without a fractional part so that `1.0` and
/// `"1"` compare equal under the text fallback.
pub(crate) fn canonical_number(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// One row of the display structure of a question.
///
/// Stored configurations write rows as tag-first arrays:
/// `["code", "Male", 1]` or `["net", "All genders", [1, 2]]`.
#[derive(PartialEq, Debug, Clone)]
pub enum DisplayRow {
    /// A single code (single choice) or an indicator column (multi select).
    Code { label: String, value: CodeValue },
    /// A roll-up of several codes or indicator columns.
    Net {
        label: String,
        values: Vec<CodeValue>,
    },
}

impl DisplayRow {
    pub fn code(label: &str, value: impl Into<CodeValue>) -> DisplayRow {
        DisplayRow::Code {
            label: label.to_string(),
            value: value.into(),
        }
    }

    pub fn net<V: Into<CodeValue>>(label: &str, values: Vec<V>) -> DisplayRow {
        DisplayRow::Net {
            label: label.to_string(),
            values: values.into_iter().map(|v| v.into()).collect(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DisplayRow::Code { label, .. } => label,
            DisplayRow::Net { label, .. } => label,
        }
    }
}

impl Serialize for DisplayRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        match self {
            DisplayRow::Code { label, value } => {
                tup.serialize_element("code")?;
                tup.serialize_element(label)?;
                tup.serialize_element(value)?;
            }
            DisplayRow::Net { label, values } => {
                tup.serialize_element("net")?;
                tup.serialize_element(label)?;
                tup.serialize_element(values)?;
            }
        }
        tup.end()
    }
}

impl<'de> Deserialize<'de> for DisplayRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(DisplayRowVisitor)
    }
}

struct DisplayRowVisitor;

impl<'de> Visitor<'de> for DisplayRowVisitor {
    type Value = DisplayRow;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, r#"an array ["code", label, value] or ["net", label, [values]]"#)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DisplayRow, A::Error> {
        let tag: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let label: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let row = match tag.as_str() {
            "code" => {
                let value: CodeValue = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                DisplayRow::Code { label, value }
            }
            "net" => {
                let values: Vec<CodeValue> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                DisplayRow::Net { label, values }
            }
            other => return Err(de::Error::unknown_variant(other, &["code", "net"])),
        };
        // Older editors appended extra elements to each row.
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(row)
    }
}

/// The variable(s) a question reads.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionVar {
    /// A single column (single choice and open numeric questions).
    Column(String),
    /// One indicator column per option (multi select questions).
    Columns(Vec<String>),
}

impl QuestionVar {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            QuestionVar::Column(c) => vec![c.as_str()],
            QuestionVar::Columns(cs) => cs.iter().map(|c| c.as_str()).collect(),
        }
    }
}

/// Governs how the display structure is aggregated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Mutually exclusive codes stored in one column.
    Single,
    /// One 0/1 indicator column per option.
    Multi,
    /// A continuous variable; only descriptive statistics are produced.
    OpenNumeric,
}

fn default_show_sigma() -> bool {
    true
}

/// The definition of one table.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub question_var: QuestionVar,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub base_text: String,
    #[serde(default)]
    pub display_structure: Vec<DisplayRow>,
    pub question_type: QuestionType,
    #[serde(default)]
    pub base_filter: Option<String>,
    #[serde(default)]
    pub mean_var: Option<String>,
    #[serde(default = "default_show_sigma")]
    pub show_sigma: bool,
}

impl QuestionConfig {
    fn new(question_var: QuestionVar, question_type: QuestionType) -> QuestionConfig {
        QuestionConfig {
            question_var,
            question_text: String::new(),
            base_text: String::new(),
            display_structure: Vec::new(),
            question_type,
            base_filter: None,
            mean_var: None,
            show_sigma: true,
        }
    }

    /// A single choice question over one coded column.
    pub fn single(column: &str, display_structure: Vec<DisplayRow>) -> QuestionConfig {
        QuestionConfig {
            display_structure,
            ..QuestionConfig::new(QuestionVar::Column(column.to_string()), QuestionType::Single)
        }
    }

    /// A multi select question, one indicator column per option.
    pub fn multi(columns: &[&str], display_structure: Vec<DisplayRow>) -> QuestionConfig {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        QuestionConfig {
            display_structure,
            ..QuestionConfig::new(QuestionVar::Columns(columns), QuestionType::Multi)
        }
    }

    /// An open numeric question summarized by its descriptive statistics.
    pub fn open_numeric(column: &str) -> QuestionConfig {
        QuestionConfig {
            mean_var: Some(column.to_string()),
            ..QuestionConfig::new(QuestionVar::Column(column.to_string()), QuestionType::OpenNumeric)
        }
    }

    /// Checks the parts of the configuration that cannot be tolerated at
    /// tabulation time.
    pub fn validate(&self) -> TableResult<()> {
        if let (QuestionType::Single, QuestionVar::Columns(cols)) =
            (self.question_type, &self.question_var)
        {
            return InvalidQuestionSnafu {
                message: format!("single question must read one column, found {:?}", cols),
            }
            .fail();
        }
        if self.question_type == QuestionType::Multi {
            for row in self.display_structure.iter() {
                match row {
                    DisplayRow::Code { label, value } if value.as_column_name().is_none() => {
                        return InvalidQuestionSnafu {
                            message: format!(
                                "multi question row {:?} must name a column, found {}",
                                label, value
                            ),
                        }
                        .fail();
                    }
                    DisplayRow::Net { label, values }
                        if values.iter().any(|v| v.as_column_name().is_none()) =>
                    {
                        return InvalidQuestionSnafu {
                            message: format!(
                                "multi question net {:?} must only name columns",
                                label
                            ),
                        }
                        .fail();
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// The indicator columns used to decide whether a respondent answered a
    /// multi select question: the `code` columns of the display structure, or
    /// the question variables when the structure has none.
    pub(crate) fn indicator_columns(&self) -> Vec<&str> {
        let from_structure: Vec<&str> = self
            .display_structure
            .iter()
            .filter_map(|row| match row {
                DisplayRow::Code { value, .. } => value.as_column_name(),
                DisplayRow::Net { .. } => None,
            })
            .collect();
        if from_structure.is_empty() {
            self.question_var.columns()
        } else {
            from_structure
        }
    }
}

/// A column of the banner: a named segment of the respondents.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BannerSegment {
    pub id: String,
    pub label: String,
    /// `None` (or an empty string) keeps every respondent. The key itself
    /// is required: `"condition": null` for the total.
    #[serde(deserialize_with = "Option::deserialize")]
    pub condition: Option<String>,
}

impl BannerSegment {
    pub fn new(id: &str, label: &str, condition: Option<&str>) -> BannerSegment {
        BannerSegment {
            id: id.to_string(),
            label: label.to_string(),
            condition: condition.map(|c| c.to_string()),
        }
    }

    /// The single "Total" segment used when no banner is configured.
    pub fn default_banner() -> Vec<BannerSegment> {
        vec![BannerSegment::new("A", "Total", None)]
    }

    pub fn column_header(&self) -> String {
        format!("{} ({})", self.id, self.label)
    }
}

/// Segment ids must be unique within a banner.
pub fn validate_banner(segments: &[BannerSegment]) -> TableResult<()> {
    let mut seen: Vec<&str> = Vec::new();
    for seg in segments.iter() {
        if seen.contains(&seg.id.as_str()) {
            return DuplicateBannerIdSnafu { id: seg.id.clone() }.fail();
        }
        seen.push(seg.id.as_str());
    }
    Ok(())
}

// ******** Output data structures *********

/// One cell of a generated table.
#[derive(PartialEq, Debug, Clone)]
pub enum TableCell {
    Count(u64),
    Text(String),
}

impl TableCell {
    pub fn text(s: &str) -> TableCell {
        TableCell::Text(s.to_string())
    }
}

impl Display for TableCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableCell::Count(c) => write!(f, "{}", c),
            TableCell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The value of a row for one segment: a count, or a formatted statistic.
#[derive(PartialEq, Debug, Clone)]
pub enum RowValue {
    Count(u64),
    Stat(String),
}

impl From<RowValue> for TableCell {
    fn from(v: RowValue) -> TableCell {
        match v {
            RowValue::Count(c) => TableCell::Count(c),
            RowValue::Stat(s) => TableCell::Text(s),
        }
    }
}

/// One row of the aggregation of a segment: its value and its percentage of
/// the base (empty for statistics).
#[derive(PartialEq, Debug, Clone)]
pub struct RowStat {
    pub value: RowValue,
    pub percent: String,
}

impl RowStat {
    pub fn count(count: u64, base_n: u64) -> RowStat {
        RowStat {
            value: RowValue::Count(count),
            percent: format_percent(count, base_n),
        }
    }

    pub fn stat(x: f64) -> RowStat {
        RowStat {
            value: RowValue::Stat(format_stat(x)),
            percent: String::new(),
        }
    }

    /// Placeholder for a label a segment did not produce.
    pub fn absent() -> RowStat {
        RowStat {
            value: RowValue::Count(0),
            percent: String::new(),
        }
    }
}

/// The rows computed for one segment, by label.
pub type SegmentRows = HashMap<String, RowStat>;

/// Percentage of the base with two decimals. A base of zero gives `0.00%`.
pub fn format_percent(count: u64, base_n: u64) -> String {
    let pct = if base_n == 0 {
        0.0
    } else {
        (count as f64 / base_n as f64) * 100.0
    };
    format!("{:.2}%", pct)
}

/// Statistics are written with two decimals, `nan` when undefined.
pub fn format_stat(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.2}", x)
    }
}

/// A banner table for one question.
///
/// The first row is always the Base row. Every content row is followed by its
/// percentage row when at least one segment produced a percentage.
#[derive(PartialEq, Debug, Clone)]
pub struct CrossTab {
    pub header: Vec<String>,
    pub rows: Vec<Vec<TableCell>>,
}

impl CrossTab {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// The labels of the first column, in output order.
    pub fn labels(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.first().map(|c| c.to_string()).unwrap_or_default())
            .collect()
    }

    /// Finds the count row with the given label.
    pub fn row(&self, label: &str) -> Option<&[TableCell]> {
        self.rows
            .iter()
            .find(|r| matches!(r.first(), Some(TableCell::Text(l)) if l == label))
            .map(|r| r.as_slice())
    }

    /// The percentage row printed under the count row with the given label.
    pub fn percent_row(&self, label: &str) -> Option<&[TableCell]> {
        let idx = self
            .rows
            .iter()
            .position(|r| matches!(r.first(), Some(TableCell::Text(l)) if l == label))?;
        self.rows
            .get(idx + 1)
            .filter(|r| matches!(r.first(), Some(TableCell::Text(l)) if l.is_empty()))
            .map(|r| r.as_slice())
    }

    /// The body of the table as text records, without the header row.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

/// Errors that prevent a table from being generated.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    #[snafu(display("could not parse expression {expression:?}"))]
    ExpressionSyntax {
        expression: String,
        source: ParseError,
    },
    #[snafu(display("expression {expression:?} refers to undefined column {column:?}"))]
    UndefinedColumn { expression: String, column: String },
    #[snafu(display("expression {expression:?}: {message}"))]
    ExpressionType { expression: String, message: String },
    #[snafu(display("invalid question configuration: {message}"))]
    InvalidQuestion { message: String },
    #[snafu(display("duplicate banner segment id {id:?}"))]
    DuplicateBannerId { id: String },
    #[snafu(display("column {column:?} has {found} rows, expected {expected}"))]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("duplicate column name {column:?}"))]
    DuplicateColumn { column: String },
    #[snafu(display("row {row} has {found} cells, expected {expected}"))]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

pub type TableResult<T> = Result<T, TableError>;
