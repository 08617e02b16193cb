use crate::api_client::{AdsApi, GraphApiClient};
use crate::campaign_source;
use crate::collector::{announce_alerts, collect};
use crate::config::Config;
use crate::error::Error;
use crate::reconciler;
use crate::report::CampaignReport;
use crate::sheets::{replace_sheet, resolve_sheet, GoogleSheetsClient, SheetStore};
use crate::table::Table;
use chrono::Local;
use log::{error, info};
use std::sync::Arc;

/// Where the raw collector output goes besides the CSV report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResultsTab {
    #[default]
    Skip,
    Named(String),
    Dated,
}

impl ResultsTab {
    fn title(&self) -> Option<String> {
        match self {
            ResultsTab::Skip => None,
            ResultsTab::Named(name) => Some(name.clone()),
            ResultsTab::Dated => Some(Local::now().format("%Y-%m-%d").to_string()),
        }
    }
}

/// Fetches every campaign and writes the CSV report, optionally mirroring
/// it to a results worksheet.
pub async fn collect_report(config: Config, results_tab: ResultsTab) -> Result<(), Error> {
    let api = GraphApiClient::new(&config)?;
    let store = if config.reads_campaigns_from_sheet() || results_tab != ResultsTab::Skip {
        Some(open_store(&config, config.spreadsheet_id()?).await?)
    } else {
        None
    };

    collect_report_with(&config, &api, store, results_tab).await
}

/// Merges the CSV report on disk into the published worksheet.
pub async fn reconcile_report(config: Config) -> Result<(), Error> {
    let fresh = Table::read_csv_file(&config.report_path)?;
    info!(
        "Read {} rows from {}",
        fresh.len(),
        config.report_path.display()
    );

    let store = open_store(&config, config.report_spreadsheet_id()?).await?;
    publish_report(&config, store.as_ref(), &fresh).await;
    Ok(())
}

/// Collects, saves the CSV, then merges the fresh table into the published worksheet.
pub async fn collect_and_reconcile(config: Config) -> Result<(), Error> {
    let api = GraphApiClient::new(&config)?;
    let report_id = config.report_spreadsheet_id()?;
    let report_store = open_store(&config, report_id).await?;

    let campaign_store = if !config.reads_campaigns_from_sheet() {
        None
    } else if config.spreadsheet_id()? == report_id {
        Some(report_store.clone())
    } else {
        Some(open_store(&config, config.spreadsheet_id()?).await?)
    };

    collect_and_reconcile_with(&config, &api, campaign_store, report_store.as_ref()).await
}

async fn collect_report_with(
    config: &Config,
    api: &dyn AdsApi,
    store: Option<Arc<dyn SheetStore>>,
    results_tab: ResultsTab,
) -> Result<(), Error> {
    let report = collect_and_save(config, api, store.clone()).await?;

    let (Some(store), Some(title)) = (store, results_tab.title()) else {
        return Ok(());
    };

    let result = async {
        ensure_not_campaign_sheet(config, store.as_ref(), config.spreadsheet_id()?, &title).await?;
        replace_sheet(store.as_ref(), &title, report.to_table().to_values()).await?;
        Ok::<_, Error>(())
    }
    .await;

    match result {
        Ok(()) => info!("Worksheet '{}' updated", title),
        Err(err) => error!("Error updating worksheet '{}': {}", title, err),
    }
    Ok(())
}

async fn collect_and_reconcile_with(
    config: &Config,
    api: &dyn AdsApi,
    campaign_store: Option<Arc<dyn SheetStore>>,
    report_store: &dyn SheetStore,
) -> Result<(), Error> {
    let report = collect_and_save(config, api, campaign_store).await?;
    publish_report(config, report_store, &report.to_table()).await;
    Ok(())
}

async fn open_store(config: &Config, spreadsheet_id: &str) -> Result<Arc<dyn SheetStore>, Error> {
    let store: Arc<dyn SheetStore> =
        Arc::new(GoogleSheetsClient::connect(config, spreadsheet_id).await?);
    Ok(store)
}

async fn collect_and_save(
    config: &Config,
    api: &dyn AdsApi,
    store: Option<Arc<dyn SheetStore>>,
) -> Result<CampaignReport, Error> {
    let campaigns = campaign_source::from_config(config, store)?.load().await?;

    let report = collect(api, &campaigns, config.date_preset).await;

    report.to_table().write_csv_file(&config.report_path)?;
    info!(
        "Report saved: {} ({} campaigns processed)",
        config.report_path.display(),
        report.snapshots.len()
    );

    announce_alerts(&report.alerts);
    Ok(report)
}

/// Fails when `target` in spreadsheet `spreadsheet_id` is the worksheet the
/// campaign list is read from.
async fn ensure_not_campaign_sheet(
    config: &Config,
    store: &dyn SheetStore,
    spreadsheet_id: &str,
    target: &str,
) -> Result<(), Error> {
    if !config.reads_campaigns_from_sheet() || config.spreadsheet_id()? != spreadsheet_id {
        return Ok(());
    }

    let campaign_sheet = resolve_sheet(store, config.sheet_name.as_deref()).await?;
    if campaign_sheet == target {
        return Err(Error::CampaignSheetTarget {
            sheet: campaign_sheet,
        });
    }
    Ok(())
}

/// Publish failures are logged, never raised: the CSV report stays valid on its own.
async fn publish_report(config: &Config, store: &dyn SheetStore, fresh: &Table) {
    let result = async {
        let sheet = resolve_sheet(store, config.report_sheet.as_deref()).await?;
        ensure_not_campaign_sheet(config, store, config.report_spreadsheet_id()?, &sheet).await?;
        reconciler::reconcile(store, &sheet, fresh, Local::now().naive_local()).await?;
        Ok::<_, Error>(sheet)
    }
    .await;

    match result {
        Ok(sheet) => info!("Worksheet '{}' reconciled", sheet),
        Err(err) => error!("Error publishing report: {}", err),
    }
}
