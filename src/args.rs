use clap::Parser;

/// This is a banner table generator for survey data.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The study settings in JSON format. The data, questions and banner files it
    /// refers to are relative to the location of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The respondent data (.csv, .xlsx, .xls, .xlsm or .ods). Setting this option overrides
    /// what may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, default questions_master.json) The question configurations in JSON format.
    #[clap(short, long, value_parser)]
    pub questions: Option<String>,

    /// (file path) The banner segments in JSON format. Defaults to the BANNER_JSON environment
    /// variable, then to banner.json. A missing or invalid file gives a single Total column.
    #[clap(short, long, value_parser)]
    pub banners: Option<String>,

    /// (file path or 'stdout') If specified, the tables will be written in CSV format to the given
    /// location. Defaults to {study name}_Output_Tables_{MMDDYYYY}.csv.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected tables in CSV format. If provided, tabgen
    /// will check that the generated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// The name of the study, printed above each table.
    #[clap(long, value_parser)]
    pub study_name: Option<String>,

    /// The name of the client, printed above each table.
    #[clap(long, value_parser)]
    pub client_name: Option<String>,

    /// (default: current month) The month of the fieldwork.
    #[clap(long, value_parser)]
    pub month: Option<String>,

    /// (default: current year) The year of the fieldwork.
    #[clap(long, value_parser)]
    pub year: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
