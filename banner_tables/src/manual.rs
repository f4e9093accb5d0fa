/*!

This is the long-form manual for `banner_tables` and `tabgen`.

## Input data

The respondent data is read from one of the following formats, chosen by the
file extension:
* `csv` Comma Separated Values. The first row holds the variable names.
* `xlsx`, `xlsm`, `xls`, `ods` Spreadsheets. The first row of the worksheet holds the
  variable names. The first worksheet is used unless `excelWorksheetName` is set.

SPSS files (`sav`) are not supported: export them to CSV first.

Before tabulation every column is converted to numbers. Empty and blank cells
become missing values, and so does any cell that is not a number. The columns
`date`, `markers`, `record` and `uuid` keep their content.

## Questions

The questions file is a JSON array. Each element describes one table:

```text
{
  "question_var": "S1",
  "question_text": "S1. What is your gender?",
  "base_text": "All respondents",
  "display_structure": [
    ["code", "Male", 1],
    ["code", "Female", 2],
    ["net", "All genders", [1, 2]]
  ],
  "question_type": "single",
  "base_filter": "S2 >= 18",
  "mean_var": null,
  "show_sigma": true
}
```

* `question_var` (string or array of strings): the column read by `single` and
  `open_numeric` questions, or the indicator columns of a `multi` question.
* `question_type`: `single`, `multi` or `open_numeric`.
* `display_structure`: the rows of the table, in order. A `code` row counts one code
  (for `multi` questions, the name of one indicator column). A `net` row counts a
  list of codes or of indicator columns.
* `base_filter` (optional): a condition selecting the respondents of the table.
* `mean_var` (optional): a numeric column. When present, the table ends with the
  `Mean`, `Std.err`, `Std.dev` and `Median` rows. Note that `Std.err` holds the sample
  standard deviation and `Std.dev` the standard error of the mean.
* `show_sigma` (optional, default `true`): adds the `No Answer` and `Sigma` rows.

For a `multi` question, a net counts every checked indicator: a respondent
checking two options of the net counts twice. A respondent answered a `multi`
question when one of the indicator columns of its `code` rows (or of
`question_var` if it has none) is 1.

Columns named by a `multi` question but absent from the data count as zero.
A `single` question whose column is absent is an error.

## Banner

The banner file is a JSON array of segments shown as columns:

```text
[
  {"id": "A", "label": "Total", "condition": null},
  {"id": "B", "label": "Male", "condition": "S1 == 1"},
  {"id": "C", "label": "Female", "condition": "S1 == 2"}
]
```

Ids must be unique and every segment must have the `id`, `label` and
`condition` keys (`null` for everyone). When the file is missing or invalid,
the banner only has the `A (Total)` column.

## Conditions

Base filters and banner conditions are boolean expressions over the columns:

```text
S1 == 2 and S2 >= 18
region == "North" or not (S3 in [1, 2, 3])
(Q1 != 1) & ~(Q2 not in (4, 5))
```

* comparisons: `==`, `!=`, `<`, `<=`, `>`, `>=`, `in`, `not in`
* connectives: `and` (or `&`), `or` (or `|`), `not` (or `~`), and parentheses
* values: numbers, strings in single or double quotes, `True` and `False`, and lists
  in brackets or parentheses on the right of a comparison
* column names containing spaces or symbols can be quoted with backticks

A comparison with a missing value is false, except for `!=` and `not in`. A
reference to a column absent from the data fails the table.

## Study settings

`tabgen` reads an optional settings file in JSON:

```text
{
  "studyName": "Brand Tracker",
  "clientName": "ACME",
  "month": "October",
  "year": "2026",
  "dataFile": "data.csv",
  "questionsFile": "questions_master.json",
  "bannerFile": "banner.json",
  "outputFile": "tables.csv"
}
```

Paths are relative to the settings file. Command line options override the
settings. The banner file defaults to the `BANNER_JSON` environment variable,
then to `banner.json`.

 */
