use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing required credential '{name}'")]
    MissingCredential { name: String },

    #[error("Invalid credential '{name}': {reason}")]
    InvalidCredential { name: String, reason: String },

    #[error("Campaign source unreadable: {message}")]
    CampaignSource { message: String },

    #[error("Refusing to write worksheet '{sheet}': it holds the campaign list")]
    CampaignSheetTarget { sheet: String },

    #[error("Table is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("Ads API responded with {status} for campaign {campaign_id}: {message}")]
    Provider {
        campaign_id: String,
        status: u16,
        message: String,
    },

    #[error("Sheets API responded with {status}: {message}")]
    SheetsApi { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    ApiFailure(#[from] reqwest::Error),

    #[error("Failed to parse URL: {0}")]
    UrlParsingFailed(#[from] url::ParseError),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}
