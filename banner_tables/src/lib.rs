/*!
Banner tables (crosstabs) for respondent-level survey data.

A question configuration describes which column(s) to read and how to lay
out its rows: single codes, nets rolling up several codes, and reconciliation
and statistics rows. A banner lists the segments of respondents shown side by
side as columns.

```
use banner_tables::*;

let dataset = Dataset::new(vec![Column::numeric(
    "Gender",
    &[Some(1.0), Some(1.0), Some(2.0), None],
)])?;
let question = QuestionConfig::single(
    "Gender",
    vec![
        DisplayRow::code("Male", 1),
        DisplayRow::code("Female", 2),
        DisplayRow::net("All Genders", vec![1, 2]),
    ],
);
let table = generate_crosstab(&dataset, &question, &BannerSegment::default_banner())?;
assert_eq!(table.row("Male").unwrap()[1], TableCell::Count(2));
assert_eq!(table.percent_row("No Answer").unwrap()[1], TableCell::text("25.00%"));
# Ok::<(), TableError>(())
```

See the [manual] for the configuration formats and the condition language.
*/

mod config;

pub mod builder;
pub mod dataset;
pub mod filter;
pub mod manual;

use log::{debug, info, warn};
use snafu::ensure;

pub use crate::config::*;
pub use crate::dataset::{
    clean_blank_and_convert_to_numeric, Cell, Column, Dataset, Subset, EXCLUDED_COLUMNS,
};
pub use crate::filter::{compile_filter, Filter, ParseError};

pub const BASE_LABEL: &str = "Base";
pub const NO_ANSWER_LABEL: &str = "No Answer";
pub const SIGMA_LABEL: &str = "Sigma";
pub const MEAN_LABEL: &str = "Mean";
// The sample standard deviation and the standard error of the mean are
// printed under each other's name. Downstream reports rely on these labels.
pub const STD_ERR_LABEL: &str = "Std.err";
pub const STD_DEV_LABEL: &str = "Std.dev";
pub const MEDIAN_LABEL: &str = "Median";

/// Statistics rows, in output order.
pub const STAT_LABELS: [&str; 4] = [MEAN_LABEL, STD_ERR_LABEL, STD_DEV_LABEL, MEDIAN_LABEL];

/// Generates the banner table of one question.
///
/// Every condition is compiled before any segment is evaluated, so a bad
/// base filter or banner condition fails the table even when the banner has
/// no segment to evaluate it against. Missing indicator columns and codes
/// absent from the data count as zero.
pub fn generate_crosstab(
    dataset: &Dataset,
    question: &QuestionConfig,
    banner: &[BannerSegment],
) -> TableResult<CrossTab> {
    question.validate()?;
    validate_banner(banner)?;
    if let (QuestionType::Single, QuestionVar::Column(column)) =
        (question.question_type, &question.question_var)
    {
        ensure!(
            dataset.column_index(column).is_some(),
            InvalidQuestionSnafu {
                message: format!("column {:?} is not in the dataset", column),
            }
        );
    }
    info!(
        "generate_crosstab: {:?} ({:?}, {} segments)",
        question.question_text,
        question.question_type,
        banner.len()
    );

    let base_filter = compile_optional(question.base_filter.as_deref(), dataset)?;
    let mut conditions: Vec<Option<Filter>> = Vec::new();
    for seg in banner.iter() {
        conditions.push(compile_optional(seg.condition.as_deref(), dataset)?);
    }

    let indicators = indicator_indices(dataset, question);
    if question.question_type == QuestionType::Multi && question.show_sigma && indicators.is_empty()
    {
        warn!(
            "generate_crosstab: no indicator column of {:?} in the dataset, every respondent is counted as no answer",
            question.question_text
        );
    }

    let mut segments: Vec<(u64, SegmentRows)> = Vec::new();
    for (seg, condition) in banner.iter().zip(conditions.iter()) {
        let (subset, base_n) = evaluate_segment(dataset, base_filter.as_ref(), condition.as_ref())?;
        debug!("generate_crosstab: segment {}: base {}", seg.id, base_n);
        let (mut rows, running_total) = aggregate(
            &subset,
            base_n,
            &question.display_structure,
            question.question_type,
            &question.question_var,
        );
        if question.show_sigma {
            rows.extend(reconcile(
                &subset,
                base_n,
                running_total,
                question.question_type,
                &indicators,
            ));
        }
        rows.extend(describe(&subset, question.mean_var.as_deref()));
        segments.push((base_n, rows));
    }
    Ok(assemble_table(question, banner, &segments))
}

// Empty and blank conditions select everyone.
fn compile_optional(expression: Option<&str>, dataset: &Dataset) -> TableResult<Option<Filter>> {
    match expression {
        Some(e) if !e.trim().is_empty() => Ok(Some(compile_filter(e, dataset)?)),
        _ => Ok(None),
    }
}

/// Applies the base filter, then the segment condition, and returns the
/// selected respondents with their count.
pub fn evaluate_segment<'a>(
    dataset: &'a Dataset,
    base_filter: Option<&Filter>,
    condition: Option<&Filter>,
) -> TableResult<(Subset<'a>, u64)> {
    let mut subset = dataset.all_rows();
    if let Some(f) = base_filter {
        subset = subset.filter(f)?;
    }
    if let Some(f) = condition {
        subset = subset.filter(f)?;
    }
    let base_n = subset.len() as u64;
    Ok((subset, base_n))
}

/// Counts every row of the display structure for one segment.
///
/// Returns the rows by label and the running total: the sum of the `code`
/// rows, which feeds the reconciliation. Nets never contribute to it.
/// Open numeric questions produce nothing here.
pub fn aggregate(
    subset: &Subset,
    base_n: u64,
    display_structure: &[DisplayRow],
    question_type: QuestionType,
    question_var: &QuestionVar,
) -> (SegmentRows, u64) {
    let dataset = subset.dataset();
    let mut rows = SegmentRows::new();
    let mut running_total: u64 = 0;
    match question_type {
        QuestionType::Single => {
            let var_idx = question_var
                .columns()
                .first()
                .and_then(|c| dataset.column_index(c));
            for row in display_structure.iter() {
                let count = match (row, var_idx) {
                    (_, None) => 0,
                    (DisplayRow::Code { value, .. }, Some(idx)) => {
                        let c = subset.count_where(idx, |cell| cell.matches_code(value));
                        running_total += c;
                        c
                    }
                    (DisplayRow::Net { values, .. }, Some(idx)) => subset.count_where(idx, |cell| {
                        values.iter().any(|v| cell.matches_code(v))
                    }),
                };
                rows.insert(row.label().to_string(), RowStat::count(count, base_n));
            }
        }
        QuestionType::Multi => {
            for row in display_structure.iter() {
                let count = match row {
                    DisplayRow::Code { value, .. } => {
                        let c = checked_count(subset, value);
                        running_total += c;
                        c
                    }
                    // A respondent checking two options of the net counts twice.
                    DisplayRow::Net { values, .. } => {
                        values.iter().map(|v| checked_count(subset, v)).sum::<u64>()
                    }
                };
                rows.insert(row.label().to_string(), RowStat::count(count, base_n));
            }
        }
        QuestionType::OpenNumeric => {}
    }
    (rows, running_total)
}

// Number of respondents with the indicator column set to 1. Zero for columns
// absent from the dataset.
fn checked_count(subset: &Subset, column: &CodeValue) -> u64 {
    column
        .as_column_name()
        .and_then(|name| subset.dataset().column_index(name))
        .map(|idx| subset.count_where(idx, |c| c.is_checked()))
        .unwrap_or(0)
}

/// Computes the "No Answer" and "Sigma" rows of one segment.
///
/// No Answer is only emitted when positive. Sigma is the running total plus
/// the no answer count and is not checked against the base. `indicators` are
/// the dataset indices of the indicator columns of a multi select question
/// (see [`indicator_indices`]).
pub fn reconcile(
    subset: &Subset,
    base_n: u64,
    running_total: u64,
    question_type: QuestionType,
    indicators: &[usize],
) -> SegmentRows {
    let no_answer = if base_n == 0 {
        0
    } else {
        match question_type {
            QuestionType::Single => base_n.saturating_sub(running_total),
            QuestionType::Multi => base_n.saturating_sub(answered_count(subset, indicators)),
            QuestionType::OpenNumeric => 0,
        }
    };
    let mut rows = SegmentRows::new();
    if no_answer > 0 {
        rows.insert(NO_ANSWER_LABEL.to_string(), RowStat::count(no_answer, base_n));
    }
    rows.insert(
        SIGMA_LABEL.to_string(),
        RowStat::count(running_total + no_answer, base_n),
    );
    rows
}

/// The indicator columns of a multi select question that are present in the
/// dataset. Empty for other question types.
pub fn indicator_indices(dataset: &Dataset, question: &QuestionConfig) -> Vec<usize> {
    if question.question_type != QuestionType::Multi {
        return Vec::new();
    }
    question
        .indicator_columns()
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect()
}

// Respondents with at least one indicator column set to 1. Recomputed from
// the columns so that nets do not skew it.
fn answered_count(subset: &Subset, indicators: &[usize]) -> u64 {
    let dataset = subset.dataset();
    subset
        .rows()
        .iter()
        .filter(|row| indicators.iter().any(|idx| dataset.cell(**row, *idx).is_checked()))
        .count() as u64
}

/// Descriptive statistics of the numeric variable of a question.
///
/// Nothing is produced when the variable is not declared or not in the
/// dataset. Missing values are skipped.
pub fn describe(subset: &Subset, mean_var: Option<&str>) -> SegmentRows {
    let mut rows = SegmentRows::new();
    let idx = match mean_var.and_then(|v| subset.dataset().column_index(v)) {
        Some(idx) => idx,
        None => return rows,
    };
    let values = subset.numbers(idx);
    let std = sample_std(&values);
    let sem = std / (values.len() as f64).sqrt();
    for (label, x) in [
        (MEAN_LABEL, mean(&values)),
        (STD_ERR_LABEL, std),
        (STD_DEV_LABEL, sem),
        (MEDIAN_LABEL, median(&values)),
    ] {
        rows.insert(label.to_string(), RowStat::stat(x));
    }
    rows
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// With one degree of freedom: undefined below two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn assemble_table(
    question: &QuestionConfig,
    banner: &[BannerSegment],
    segments: &[(u64, SegmentRows)],
) -> CrossTab {
    let produced = |label: &str| segments.iter().any(|(_, rows)| rows.contains_key(label));

    let mut final_labels: Vec<&str> = question
        .display_structure
        .iter()
        .map(|r| r.label())
        .collect();
    if question.show_sigma {
        for label in [NO_ANSWER_LABEL, SIGMA_LABEL] {
            if produced(label) {
                final_labels.push(label);
            }
        }
    }
    for label in STAT_LABELS {
        if produced(label) {
            final_labels.push(label);
        }
    }

    let mut header = vec!["Label".to_string()];
    header.extend(banner.iter().map(|seg| seg.column_header()));

    let mut rows: Vec<Vec<TableCell>> = Vec::new();
    let mut base_row = vec![TableCell::text(BASE_LABEL)];
    base_row.extend(segments.iter().map(|(base_n, _)| TableCell::Count(*base_n)));
    rows.push(base_row);

    for label in final_labels {
        let mut count_row = vec![TableCell::text(label)];
        let mut percent_row = vec![TableCell::text("")];
        let mut has_percent = false;
        for (_, seg_rows) in segments.iter() {
            let stat = seg_rows.get(label).cloned().unwrap_or_else(RowStat::absent);
            has_percent |= !stat.percent.is_empty();
            count_row.push(stat.value.into());
            percent_row.push(TableCell::Text(stat.percent));
        }
        rows.push(count_row);
        if has_percent {
            rows.push(percent_row);
        }
    }
    CrossTab { header, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn count(c: u64) -> TableCell {
        TableCell::Count(c)
    }

    fn text(s: &str) -> TableCell {
        TableCell::text(s)
    }

    fn gender_dataset() -> Dataset {
        Dataset::new(vec![
            Column::numeric("Gender", &[Some(1.0), Some(1.0), Some(2.0), None]),
            Column::numeric("Age", &[Some(20.0), Some(30.0), Some(40.0), None]),
        ])
        .unwrap()
    }

    fn gender_question() -> QuestionConfig {
        QuestionConfig::single(
            "Gender",
            vec![
                DisplayRow::code("Male", 1),
                DisplayRow::code("Female", 2),
                DisplayRow::net("All Genders", vec![1, 2]),
            ],
        )
    }

    fn multi_dataset() -> Dataset {
        Dataset::new(vec![
            Column::numeric("A_1", &[Some(1.0), Some(1.0), Some(0.0), Some(0.0)]),
            Column::numeric("A_2", &[Some(1.0), Some(0.0), Some(0.0), Some(0.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn single_question_with_net() {
        init();
        let table = generate_crosstab(
            &gender_dataset(),
            &gender_question(),
            &BannerSegment::default_banner(),
        )
        .unwrap();
        assert_eq!(table.header(), &["Label".to_string(), "A (Total)".to_string()]);
        assert_eq!(
            table.rows,
            vec![
                vec![text("Base"), count(4)],
                vec![text("Male"), count(2)],
                vec![text(""), text("50.00%")],
                vec![text("Female"), count(1)],
                vec![text(""), text("25.00%")],
                vec![text("All Genders"), count(3)],
                vec![text(""), text("75.00%")],
                vec![text("No Answer"), count(1)],
                vec![text(""), text("25.00%")],
                vec![text("Sigma"), count(4)],
                vec![text(""), text("100.00%")],
            ]
        );
    }

    #[test]
    fn partitioning_codes_reconcile_with_base() {
        let table = generate_crosstab(
            &gender_dataset(),
            &gender_question(),
            &BannerSegment::default_banner(),
        )
        .unwrap();
        let get = |label: &str| match table.row(label).unwrap()[1] {
            TableCell::Count(c) => c,
            _ => panic!("not a count"),
        };
        assert_eq!(get("Male") + get("Female") + get("No Answer"), get("Base"));
        assert_eq!(get("Sigma"), get("Base"));
        assert!(get("All Genders") <= get("Base"));
    }

    #[test]
    fn multi_net_sums_indicators() {
        init();
        let q = QuestionConfig::multi(
            &["A_1", "A_2"],
            vec![DisplayRow::net("Any", vec!["A_1", "A_2"])],
        );
        let table =
            generate_crosstab(&multi_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("Base").unwrap()[1], count(4));
        assert_eq!(table.row("Any").unwrap()[1], count(3));
        assert_eq!(table.percent_row("Any").unwrap()[1], text("75.00%"));
        assert_eq!(table.row("No Answer").unwrap()[1], count(2));
        // Nets are not part of the running total.
        assert_eq!(table.row("Sigma").unwrap()[1], count(2));
    }

    #[test]
    fn multi_sigma_can_exceed_base() {
        let q = QuestionConfig::multi(
            &["A_1", "A_2"],
            vec![
                DisplayRow::code("First", "A_1"),
                DisplayRow::code("Second", "A_2"),
                DisplayRow::code("Third", "A_3"),
                DisplayRow::net("Any", vec!["A_1", "A_2", "A_3"]),
            ],
        );
        let table =
            generate_crosstab(&multi_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("First").unwrap()[1], count(2));
        assert_eq!(table.row("Second").unwrap()[1], count(1));
        assert_eq!(table.row("Third").unwrap()[1], count(0));
        assert_eq!(table.row("Any").unwrap()[1], count(3));
        assert_eq!(table.row("No Answer").unwrap()[1], count(2));
        assert_eq!(table.row("Sigma").unwrap()[1], count(5));
        assert_eq!(table.percent_row("Sigma").unwrap()[1], text("125.00%"));
    }

    #[test]
    fn multi_without_indicator_columns() {
        init();
        let q = QuestionConfig::multi(&["B_1"], vec![DisplayRow::code("B", "B_1")]);
        let table =
            generate_crosstab(&multi_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("B").unwrap()[1], count(0));
        assert_eq!(table.row("No Answer").unwrap()[1], count(4));
        assert_eq!(table.row("Sigma").unwrap()[1], count(4));
    }

    #[test]
    fn indicator_columns_resolved_once_per_question() {
        let ds = multi_dataset();
        let missing = QuestionConfig::multi(&["B_1"], vec![DisplayRow::code("B", "B_1")]);
        assert!(indicator_indices(&ds, &missing).is_empty());
        let present = QuestionConfig::multi(
            &["A_1", "A_2"],
            vec![DisplayRow::code("First", "A_1"), DisplayRow::code("Absent", "A_9")],
        );
        assert_eq!(indicator_indices(&ds, &present), vec![ds.column_index("A_1").unwrap()]);
        assert!(indicator_indices(&ds, &QuestionConfig::single("A_1", vec![])).is_empty());

        // Several segments share the same resolution.
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("B", "Again", Some("")),
        ];
        let table = generate_crosstab(&ds, &missing, &banner).unwrap();
        assert_eq!(table.row("No Answer").unwrap()[1..], [count(4), count(4)]);
    }

    #[test]
    fn undefined_column_in_base_filter() {
        let mut q = gender_question();
        q.base_filter = Some("Q1 == 1".to_string());
        let res = generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner());
        assert!(matches!(res, Err(TableError::UndefinedColumn { .. })));
        // Also without any segment.
        let res = generate_crosstab(&gender_dataset(), &q, &[]);
        assert!(res.is_err());
    }

    #[test]
    fn undefined_column_in_banner_condition() {
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("B", "Boosted", Some("vboost == 1")),
        ];
        let res = generate_crosstab(&gender_dataset(), &gender_question(), &banner);
        assert!(matches!(res, Err(TableError::UndefinedColumn { .. })));
    }

    #[test]
    fn empty_base_gives_zero_percentages() {
        let banner = vec![
            BannerSegment::new("A", "Total", Some("")),
            BannerSegment::new("B", "Nobody", Some("Gender == 9")),
        ];
        let table = generate_crosstab(&gender_dataset(), &gender_question(), &banner).unwrap();
        assert_eq!(table.row("Base").unwrap(), &[text("Base"), count(4), count(0)]);
        for label in ["Male", "Female", "All Genders", "Sigma"] {
            assert_eq!(table.row(label).unwrap()[2], count(0));
            assert_eq!(table.percent_row(label).unwrap()[2], text("0.00%"));
        }
        // No Answer comes from the first segment only.
        assert_eq!(table.row("No Answer").unwrap()[2], count(0));
        assert_eq!(table.percent_row("No Answer").unwrap()[2], text(""));
    }

    #[test]
    fn base_filter_then_condition() {
        let mut q = gender_question();
        q.base_filter = Some("Age >= 30".to_string());
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("B", "Men", Some("Gender == 1")),
        ];
        let table = generate_crosstab(&gender_dataset(), &q, &banner).unwrap();
        assert_eq!(table.row("Base").unwrap(), &[text("Base"), count(2), count(1)]);
        assert_eq!(table.row("Male").unwrap(), &[text("Male"), count(1), count(1)]);
        assert_eq!(table.row("Female").unwrap(), &[text("Female"), count(1), count(0)]);
    }

    #[test]
    fn statistics_rows() {
        let mut q = gender_question();
        q.mean_var = Some("Age".to_string());
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("B", "Men", Some("Gender == 1")),
            BannerSegment::new("C", "Women", Some("Gender == 2")),
        ];
        let table = generate_crosstab(&gender_dataset(), &q, &banner).unwrap();
        assert_eq!(
            table.row("Mean").unwrap(),
            &[text("Mean"), text("30.00"), text("25.00"), text("40.00")]
        );
        // Sample standard deviation, under the Std.err label.
        assert_eq!(
            table.row("Std.err").unwrap(),
            &[text("Std.err"), text("10.00"), text("7.07"), text("nan")]
        );
        // Standard error of the mean, under the Std.dev label.
        assert_eq!(
            table.row("Std.dev").unwrap(),
            &[text("Std.dev"), text("5.77"), text("5.00"), text("nan")]
        );
        assert_eq!(
            table.row("Median").unwrap(),
            &[text("Median"), text("30.00"), text("25.00"), text("40.00")]
        );
        // Statistics have no percentage row.
        assert_eq!(table.percent_row("Mean"), None);
        assert_eq!(table.percent_row("Median"), None);
    }

    #[test]
    fn row_order() {
        let mut q = QuestionConfig::single(
            "Gender",
            vec![
                DisplayRow::net("All Genders", vec![1, 2]),
                DisplayRow::code("Female", 2),
                DisplayRow::code("Male", 1),
            ],
        );
        q.mean_var = Some("Age".to_string());
        let table =
            generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        let labels: Vec<String> = table
            .labels()
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Base",
                "All Genders",
                "Female",
                "Male",
                "No Answer",
                "Sigma",
                "Mean",
                "Std.err",
                "Std.dev",
                "Median"
            ]
        );
    }

    #[test]
    fn hidden_sigma() {
        let mut q = gender_question();
        q.show_sigma = false;
        let table =
            generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("No Answer"), None);
        assert_eq!(table.row("Sigma"), None);
        assert_eq!(table.rows.len(), 7);
    }

    #[test]
    fn open_numeric_question() {
        let mut q = QuestionConfig::open_numeric("Age");
        q.display_structure = vec![DisplayRow::code("Years", 1)];
        let table =
            generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        // Display rows are kept as zero counts without percentages.
        assert_eq!(table.row("Years").unwrap(), &[text("Years"), count(0)]);
        assert_eq!(table.percent_row("Years"), None);
        assert_eq!(table.row("No Answer"), None);
        assert_eq!(table.row("Sigma").unwrap()[1], count(0));
        assert_eq!(table.percent_row("Sigma").unwrap()[1], text("0.00%"));
        assert_eq!(table.row("Mean").unwrap()[1], text("30.00"));
    }

    #[test]
    fn text_codes_match_numeric_columns() {
        let q = QuestionConfig::single(
            "Gender",
            vec![DisplayRow::code("Male", "1"), DisplayRow::net("Any", vec!["1", "2"])],
        );
        let table =
            generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("Male").unwrap()[1], count(2));
        assert_eq!(table.row("Any").unwrap()[1], count(3));
    }

    #[test]
    fn text_columns_match_numeric_codes() {
        let ds = Dataset::new(vec![Column::new(
            "record",
            vec![Cell::from("7"), Cell::from("8"), Cell::from("7")],
        )])
        .unwrap();
        let q = QuestionConfig::single("record", vec![DisplayRow::code("Seven", 7)]);
        let table = generate_crosstab(&ds, &q, &BannerSegment::default_banner()).unwrap();
        assert_eq!(table.row("Seven").unwrap()[1], count(2));
        assert_eq!(table.row("No Answer").unwrap()[1], count(1));
    }

    #[test]
    fn single_question_needs_its_column() {
        let q = QuestionConfig::single("S9", vec![DisplayRow::code("Yes", 1)]);
        let res = generate_crosstab(&gender_dataset(), &q, &BannerSegment::default_banner());
        assert!(matches!(res, Err(TableError::InvalidQuestion { .. })));
    }

    #[test]
    fn duplicate_banner_ids() {
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("A", "Again", None),
        ];
        let res = generate_crosstab(&gender_dataset(), &gender_question(), &banner);
        assert!(matches!(res, Err(TableError::DuplicateBannerId { .. })));
    }

    #[test]
    fn generation_is_idempotent() {
        let ds = gender_dataset();
        let mut q = gender_question();
        q.mean_var = Some("Age".to_string());
        let banner = vec![
            BannerSegment::new("A", "Total", None),
            BannerSegment::new("B", "Men", Some("Gender == 1")),
        ];
        let first = generate_crosstab(&ds, &q, &banner).unwrap();
        let second = generate_crosstab(&ds, &q, &banner).unwrap();
        assert_eq!(first.to_records(), second.to_records());
        assert_eq!(ds, gender_dataset());
    }

    #[test]
    fn segment_evaluation() {
        let ds = gender_dataset();
        let base = compile_filter("Age > 20", &ds).unwrap();
        let cond = compile_filter("Gender == 2", &ds).unwrap();
        let (subset, base_n) = evaluate_segment(&ds, Some(&base), Some(&cond)).unwrap();
        assert_eq!(base_n, 1);
        assert_eq!(subset.rows(), &[2]);
        let (_, all) = evaluate_segment(&ds, None, None).unwrap();
        assert_eq!(all, 4);
    }

    #[test]
    fn statistics_of_empty_subsets() {
        let ds = gender_dataset();
        let cond = compile_filter("Gender == 9", &ds).unwrap();
        let (subset, _) = evaluate_segment(&ds, None, Some(&cond)).unwrap();
        let rows = describe(&subset, Some("Age"));
        assert_eq!(rows[MEAN_LABEL].value, RowValue::Stat("nan".to_string()));
        assert_eq!(rows[MEDIAN_LABEL].value, RowValue::Stat("nan".to_string()));
        assert!(describe(&subset, Some("Weight")).is_empty());
        assert!(describe(&subset, None).is_empty());
    }

    #[test]
    fn median_of_even_counts() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[5.0]), 5.0);
    }
}
