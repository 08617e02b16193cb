use crate::error::Error;
use clap::{Args as ClapArgs, ValueEnum};
use std::path::PathBuf;

const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v19.0";
const DEFAULT_SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
const DEFAULT_REPORT_PATH: &str = "Campaign_Insights.csv";
const DEFAULT_RESULTS_SHEET: &str = "Results";

/// Reporting window understood by the insights endpoint.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum DatePreset {
    Today,
    Yesterday,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    #[value(name = "last_7d")]
    Last7d,
    #[value(name = "last_14d")]
    Last14d,
    #[value(name = "last_30d")]
    Last30d,
    #[value(name = "last_90d")]
    Last90d,
    Maximum,
}

impl DatePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePreset::Today => "today",
            DatePreset::Yesterday => "yesterday",
            DatePreset::ThisMonth => "this_month",
            DatePreset::LastMonth => "last_month",
            DatePreset::ThisQuarter => "this_quarter",
            DatePreset::LastQuarter => "last_quarter",
            DatePreset::ThisYear => "this_year",
            DatePreset::LastYear => "last_year",
            DatePreset::Last7d => "last_7d",
            DatePreset::Last14d => "last_14d",
            DatePreset::Last30d => "last_30d",
            DatePreset::Last90d => "last_90d",
            DatePreset::Maximum => "maximum",
        }
    }
}

#[derive(ClapArgs, Clone, Debug)]
pub struct Config {
    #[arg(long, default_value = DEFAULT_GRAPH_API_URL, env = "GRAPH_API_URL")]
    pub(crate) graph_api_url: String,

    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub(crate) access_token: Option<String>,

    #[arg(long, value_enum, default_value_t = DatePreset::ThisMonth, env = "DATE_PRESET")]
    pub(crate) date_preset: DatePreset,

    #[arg(long, default_value = DEFAULT_SHEETS_API_URL, env = "SHEETS_API_URL")]
    pub(crate) sheets_api_url: String,

    #[arg(long, env = "CAMPAIGN_INFO_SPREADSHEET_ID")]
    pub(crate) spreadsheet_id: Option<String>,

    /// Spreadsheet holding the published report (the campaign spreadsheet when unset)
    #[arg(long, env = "REPORT_SPREADSHEET_ID")]
    pub(crate) report_spreadsheet_id: Option<String>,

    #[arg(long, env = "GOOGLE_CREDENTIALS_JSON", hide_env_values = true)]
    pub(crate) google_credentials_json: Option<String>,

    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub(crate) google_credentials_file: Option<PathBuf>,

    /// Worksheet holding the campaign list (first sheet when unset)
    #[arg(long, env = "SHEET_NAME")]
    pub(crate) sheet_name: Option<String>,

    /// Worksheet holding the published report (first sheet when unset)
    #[arg(long, env = "REPORT_SHEET")]
    pub(crate) report_sheet: Option<String>,

    #[arg(long, default_value = DEFAULT_RESULTS_SHEET, env = "RESULTS_SHEET")]
    pub(crate) results_sheet: String,

    #[arg(long, env = "CAMPAIGNS_FILE")]
    pub(crate) campaigns_file: Option<PathBuf>,

    #[arg(long, env = "CAMPAIGNS_CSV", hide_env_values = true)]
    pub(crate) campaigns_csv: Option<String>,

    #[arg(long, default_value = DEFAULT_REPORT_PATH, env = "REPORT_PATH")]
    pub(crate) report_path: PathBuf,
}

impl Config {
    pub fn access_token(&self) -> Result<&str, Error> {
        require(self.access_token.as_deref(), "ACCESS_TOKEN")
    }

    pub fn spreadsheet_id(&self) -> Result<&str, Error> {
        require(self.spreadsheet_id.as_deref(), "CAMPAIGN_INFO_SPREADSHEET_ID")
    }

    pub fn report_spreadsheet_id(&self) -> Result<&str, Error> {
        match self.report_spreadsheet_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => self.spreadsheet_id(),
        }
    }

    /// Whether campaigns come from a spreadsheet rather than a CSV.
    pub fn reads_campaigns_from_sheet(&self) -> bool {
        self.campaigns_file.is_none() && self.campaigns_csv.is_none()
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingCredential {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        graph_api_url: "https://graph.example.com/v19.0".to_string(),
        access_token: Some("test_token".to_string()),
        date_preset: DatePreset::ThisMonth,
        sheets_api_url: "https://sheets.example.com/v4".to_string(),
        spreadsheet_id: Some("sheet123".to_string()),
        report_spreadsheet_id: None,
        google_credentials_json: None,
        google_credentials_file: None,
        sheet_name: None,
        report_sheet: None,
        results_sheet: DEFAULT_RESULTS_SHEET.to_string(),
        campaigns_file: None,
        campaigns_csv: None,
        report_path: PathBuf::from(DEFAULT_REPORT_PATH),
    }
}
