use crate::auth::{fetch_access_token, ServiceAccountKey};
use crate::config::Config;
use crate::error::Error;
use log::info;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

const NEW_SHEET_ROWS: u32 = 100;
const NEW_SHEET_COLUMNS: u32 = 10;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SheetStore: Send + Sync + 'static {
    /// Title of the first worksheet in the spreadsheet.
    async fn first_sheet_title(&self) -> Result<String, Error>;

    /// Creates the worksheet when no worksheet with that title exists.
    /// # Returns
    /// `true` when the worksheet was created.
    async fn ensure_sheet(&self, title: &str) -> Result<bool, Error>;

    /// Reads every value in an A1 range, row-major. Trailing empty cells may be omitted.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<Value>>, Error>;

    /// Writes rows starting at the top-left cell of the range in a single request.
    async fn update_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), Error>;

    async fn clear_values(&self, range: &str) -> Result<(), Error>;
}

/// A1 notation for a cell or range inside a named worksheet.
pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cells)
}

/// Whole-sheet range, as accepted by the values endpoints.
pub fn sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// Resolves an optional worksheet name, defaulting to the first sheet.
pub async fn resolve_sheet(store: &dyn SheetStore, name: Option<&str>) -> Result<String, Error> {
    match name {
        Some(name) => Ok(name.to_string()),
        None => store.first_sheet_title().await,
    }
}

/// Replaces the whole worksheet with `values`, creating the worksheet if needed.
pub async fn replace_sheet(
    store: &dyn SheetStore,
    title: &str,
    values: Vec<Vec<String>>,
) -> Result<(), Error> {
    if !store.ensure_sheet(title).await? {
        store.clear_values(&sheet_range(title)).await?;
    }
    store.update_values(&a1_range(title, "A1"), values).await
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    bearer: String,
}

impl GoogleSheetsClient {
    /// Opens a spreadsheet, exchanging the service-account key for an access
    /// token once for the whole run.
    pub async fn connect(config: &Config, spreadsheet_id: &str) -> Result<Self, Error> {
        let spreadsheet_id = spreadsheet_id.to_string();
        let key = ServiceAccountKey::from_config(config)?;
        let client = Client::new();
        let token = fetch_access_token(&client, &key).await?;

        info!("Connected to spreadsheet {}", spreadsheet_id);

        Ok(GoogleSheetsClient {
            client,
            base_url: config.sheets_api_url.to_string(),
            spreadsheet_id,
            bearer: format!("Bearer {}", token),
        })
    }

    fn spreadsheet_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::UrlParsingFailed(url::ParseError::SetHostOnCannotBeABaseUrl))?
            .pop_if_empty()
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, Error> {
        let segment = format!("{}{}", range, suffix);
        self.spreadsheet_url(&[self.spreadsheet_id.as_str(), "values", segment.as_str()])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let resp = request.header(AUTHORIZATION, &self.bearer).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp.text().await.unwrap_or_default();
        Err(Error::SheetsApi {
            status: status.as_u16(),
            message,
        })
    }

    async fn sheet_titles(&self) -> Result<Vec<String>, Error> {
        let mut url = self.spreadsheet_url(&[self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let meta = self
            .send(self.client.get(url))
            .await?
            .json::<SpreadsheetMeta>()
            .await?;

        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }
}

#[async_trait::async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn first_sheet_title(&self) -> Result<String, Error> {
        self.sheet_titles()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::SheetsApi {
                status: 404,
                message: format!("spreadsheet {} has no worksheets", self.spreadsheet_id),
            })
    }

    async fn ensure_sheet(&self, title: &str) -> Result<bool, Error> {
        if self.sheet_titles().await?.iter().any(|t| t == title) {
            return Ok(false);
        }

        let batch_update = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.spreadsheet_url(&[batch_update.as_str()])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLUMNS,
                        }
                    }
                }
            }]
        });
        self.send(self.client.post(url).json(&body)).await?;

        info!("Created worksheet '{}'", title);
        Ok(true)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<Value>>, Error> {
        let url = self.values_url(range, "")?;
        let body = self
            .send(self.client.get(url))
            .await?
            .json::<ValueRange>()
            .await?;
        Ok(body.values)
    }

    async fn update_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), Error> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn clear_values(&self, range: &str) -> Result<(), Error> {
        let url = self.values_url(range, ":clear")?;
        self.send(self.client.post(url).json(&json!({}))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleSheetsClient {
        GoogleSheetsClient {
            client: Client::new(),
            base_url: "https://sheets.example.com/v4".to_string(),
            spreadsheet_id: "sheet123".to_string(),
            bearer: "Bearer token".to_string(),
        }
    }

    #[test]
    fn test_a1_range_quotes_sheet_name() {
        assert_eq!(a1_range("Results", "A1"), "'Results'!A1");
        assert_eq!(a1_range("Bob's tab", "A2"), "'Bob''s tab'!A2");
        assert_eq!(sheet_range("October"), "'October'");
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = client().values_url("'My Sheet'!A2", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example.com/v4/spreadsheets/sheet123/values/'My%20Sheet'!A2"
        );
    }

    #[test]
    fn test_clear_url_suffix() {
        let url = client().values_url("'Results'", ":clear").unwrap();
        assert!(url.as_str().ends_with("/values/'Results':clear"));
    }

    #[tokio::test]
    async fn test_replace_sheet_clears_existing() {
        let mut store = MockSheetStore::new();
        store.expect_ensure_sheet().returning(|_| Ok(false));
        store
            .expect_clear_values()
            .withf(|range| range == "'Results'")
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_update_values()
            .withf(|range, values| range == "'Results'!A1" && values.len() == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        replace_sheet(&store, "Results", vec![vec!["Campaign Name".to_string()]])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replace_sheet_new_sheet_skips_clear() {
        let mut store = MockSheetStore::new();
        store.expect_ensure_sheet().returning(|_| Ok(true));
        store.expect_clear_values().never();
        store.expect_update_values().returning(|_, _| Ok(()));

        replace_sheet(&store, "Results", vec![]).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_sheet_defaults_to_first() {
        let mut store = MockSheetStore::new();
        store
            .expect_first_sheet_title()
            .times(1)
            .returning(|| Ok("Campaigns".to_string()));

        assert_eq!(resolve_sheet(&store, None).await.unwrap(), "Campaigns");
        assert_eq!(
            resolve_sheet(&store, Some("October")).await.unwrap(),
            "October"
        );
    }
}
