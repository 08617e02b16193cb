use crate::config::Config;
use crate::error::Error;
use crate::report::{CampaignRecord, CAMPAIGN_ID, CAMPAIGN_NAME};
use crate::sheets::{resolve_sheet, sheet_range, SheetStore};
use crate::table::Table;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait CampaignSource: Send + Sync + 'static {
    /// Loads the campaigns to report on, in the order they should be processed.
    ///
    /// # Returns
    /// A Result containing the campaign records or an Error when the source
    /// cannot be read or lacks the `Campaign Name` / `Campaign ID` columns.
    async fn load(&self) -> Result<Vec<CampaignRecord>, Error>;
}

/// Picks the campaign source from configuration: a CSV file, inline CSV text,
/// or a worksheet, in that order of precedence.
pub fn from_config(
    config: &Config,
    store: Option<Arc<dyn SheetStore>>,
) -> Result<Box<dyn CampaignSource>, Error> {
    if let Some(path) = &config.campaigns_file {
        return Ok(Box::new(CsvCampaignSource::File(path.clone())));
    }
    if let Some(text) = &config.campaigns_csv {
        return Ok(Box::new(CsvCampaignSource::Inline(text.clone())));
    }
    match store {
        Some(store) => Ok(Box::new(SheetCampaignSource {
            store,
            worksheet: config.sheet_name.clone(),
        })),
        None => Err(Error::CampaignSource {
            message: "no campaign file, inline CSV or spreadsheet configured".to_string(),
        }),
    }
}

#[derive(Clone, Debug)]
pub enum CsvCampaignSource {
    File(PathBuf),
    Inline(String),
}

#[async_trait::async_trait]
impl CampaignSource for CsvCampaignSource {
    async fn load(&self) -> Result<Vec<CampaignRecord>, Error> {
        let table = match self {
            CsvCampaignSource::File(path) => {
                Table::read_csv_file(path).map_err(|e| Error::CampaignSource {
                    message: format!("{}: {}", path.display(), e),
                })?
            }
            CsvCampaignSource::Inline(text) => {
                Table::read_csv(text.as_bytes()).map_err(|e| Error::CampaignSource {
                    message: format!("inline CSV: {}", e),
                })?
            }
        };

        let campaigns = records_from_table(&table)?;
        info!("Loaded {} campaigns from CSV", campaigns.len());
        Ok(campaigns)
    }
}

pub struct SheetCampaignSource {
    store: Arc<dyn SheetStore>,
    worksheet: Option<String>,
}

#[async_trait::async_trait]
impl CampaignSource for SheetCampaignSource {
    async fn load(&self) -> Result<Vec<CampaignRecord>, Error> {
        let result = async {
            let title = resolve_sheet(self.store.as_ref(), self.worksheet.as_deref()).await?;
            let values = self.store.get_values(&sheet_range(&title)).await?;
            let campaigns = records_from_table(&Table::from_values(values))?;
            Ok::<_, Error>((title, campaigns))
        }
        .await;

        let (title, campaigns) = result.map_err(|e| Error::CampaignSource {
            message: format!("spreadsheet: {}", e),
        })?;

        info!(
            "Loaded {} campaigns from worksheet '{}'",
            campaigns.len(),
            title
        );
        Ok(campaigns)
    }
}

fn records_from_table(table: &Table) -> Result<Vec<CampaignRecord>, Error> {
    if table.columns().is_empty() {
        return Ok(Vec::new());
    }

    let name_idx = table.require_column(CAMPAIGN_NAME)?;
    let id_idx = table.require_column(CAMPAIGN_ID)?;

    Ok(table
        .rows()
        .iter()
        .map(|row| CampaignRecord {
            id: row[id_idx].normalize(),
            name: row[name_idx].normalize(),
        })
        .filter(|record| !record.id.is_empty())
        .collect())
}
