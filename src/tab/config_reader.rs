use crate::args::Args;
use crate::tab::export::{default_output_name, ReportHeader, STDOUT};
use crate::tab::*;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_QUESTIONS_FILE: &str = "questions_master.json";
pub const DEFAULT_BANNER_FILE: &str = "banner.json";
pub const BANNER_ENV_VAR: &str = "BANNER_JSON";

/// The study settings file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudySettings {
    #[serde(rename = "studyName")]
    pub study_name: Option<String>,
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "dataFile")]
    pub data_file: Option<String>,
    #[serde(rename = "questionsFile")]
    pub questions_file: Option<String>,
    #[serde(rename = "bannerFile")]
    pub banner_file: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

/// Everything needed for one run, after merging the command line, the study
/// settings and the defaults.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabSettings {
    pub study_name: String,
    pub client_name: String,
    pub month: String,
    pub year: String,
    pub data_file: PathBuf,
    pub questions_file: PathBuf,
    pub banner_file: PathBuf,
    /// A file path or `stdout`.
    pub output: String,
    pub excel_worksheet_name: Option<String>,
}

impl TabSettings {
    pub fn header(&self) -> ReportHeader {
        ReportHeader {
            client_name: self.client_name.clone(),
            study_name: self.study_name.clone(),
            month: self.month.clone(),
            year: self.year.clone(),
        }
    }
}

pub fn read_study_settings(path: &str) -> TabResult<StudySettings> {
    info!("read_study_settings: reading {:?}", path);
    let config_str = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let settings: StudySettings =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path })?;
    debug!("read_study_settings: {:?}", settings);
    Ok(settings)
}

/// Merges the command line options with the study settings.
///
/// Command line paths are taken as given. Paths from the study settings are
/// relative to the settings file.
pub fn resolve_settings(args: &Args, today: NaiveDate) -> TabResult<TabSettings> {
    let (study, root_p) = match &args.config {
        Some(config_p) => {
            let root_p = Path::new(config_p)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (read_study_settings(config_p)?, root_p)
        }
        None => (StudySettings::default(), PathBuf::new()),
    };
    let from_study = |p: &Option<String>| p.as_ref().map(|p| root_p.join(p));

    let data_file = match args.input.as_ref().map(PathBuf::from) {
        Some(p) => p,
        None => match from_study(&study.data_file) {
            Some(p) => p,
            None => whatever!("No data file: use --input or set dataFile in the study settings"),
        },
    };
    let questions_file = args
        .questions
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| from_study(&study.questions_file))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_QUESTIONS_FILE));
    let banner_file = args
        .banners
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| from_study(&study.banner_file))
        .or_else(|| env::var(BANNER_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BANNER_FILE));

    let study_name = args
        .study_name
        .clone()
        .or(study.study_name)
        .unwrap_or_else(|| default_study_name(&data_file));
    let output = match (&args.out, &study.output_file) {
        (Some(o), _) => o.clone(),
        (None, Some(o)) if o == STDOUT => o.clone(),
        (None, Some(o)) => root_p.join(o).to_string_lossy().to_string(),
        (None, None) => default_output_name(&study_name, today),
    };

    Ok(TabSettings {
        client_name: args
            .client_name
            .clone()
            .or(study.client_name)
            .unwrap_or_default(),
        month: args
            .month
            .clone()
            .or(study.month)
            .unwrap_or_else(|| today.format("%B").to_string()),
        year: args
            .year
            .clone()
            .or(study.year)
            .unwrap_or_else(|| today.format("%Y").to_string()),
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or(study.excel_worksheet_name),
        study_name,
        data_file,
        questions_file,
        banner_file,
        output,
    })
}

fn default_study_name(data_file: &Path) -> String {
    data_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Study")
        .to_string()
}

/// Reads the question configurations.
///
/// The file must be a JSON array. Each element is decoded on its own so that
/// a broken record only fails its own table.
pub fn read_questions(path: &Path) -> TabResult<Vec<TabResult<QuestionConfig>>> {
    let path_s = path.to_string_lossy().to_string();
    info!("read_questions: reading {:?}", path_s);
    let questions_str = fs::read_to_string(path).context(OpeningFileSnafu { path: &path_s })?;
    let records: Vec<JSValue> =
        serde_json::from_str(&questions_str).context(ParsingJsonSnafu { path: &path_s })?;
    debug!("read_questions: {} question records", records.len());
    Ok(parse_questions(records))
}

pub fn parse_questions(records: Vec<JSValue>) -> Vec<TabResult<QuestionConfig>> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, js)| {
            serde_json::from_value::<QuestionConfig>(js)
                .context(ParsingQuestionSnafu {
                    table_number: idx + 1,
                })
        })
        .collect()
}

/// Reads the banner segments.
///
/// Falls back to the single Total segment when the file is missing or
/// cannot be understood.
pub fn read_banner(path: &Path) -> Vec<BannerSegment> {
    if !path.exists() {
        info!(
            "read_banner: {:?} not found, using the default banner",
            path
        );
        return BannerSegment::default_banner();
    }
    info!("read_banner: reading {:?}", path);
    match fs::read_to_string(path) {
        Ok(banner_str) => parse_banner(&banner_str).unwrap_or_else(|msg| {
            warn!(
                "read_banner: invalid banner in {:?} ({}), using the default banner",
                path, msg
            );
            BannerSegment::default_banner()
        }),
        Err(e) => {
            warn!(
                "read_banner: could not read {:?} ({}), using the default banner",
                path, e
            );
            BannerSegment::default_banner()
        }
    }
}

fn parse_banner(banner_str: &str) -> Result<Vec<BannerSegment>, String> {
    let segments: Vec<BannerSegment> =
        serde_json::from_str(banner_str).map_err(|e| e.to_string())?;
    validate_banner(&segments).map_err(|e| e.to_string())?;
    debug!("read_banner: {:?}", segments);
    Ok(segments)
}
