use crate::api_client::AdsApi;
use crate::config::DatePreset;
use crate::report::{AlertSet, CampaignRecord, CampaignReport, CampaignStatus, MetricSnapshot};
use log::{error, info, warn};

/// Fetches status and insights for every campaign, in input order.
///
/// Remote failures never abort the pass: a failed status lookup degrades to
/// `UNKNOWN`, a failed or empty insights lookup skips the campaign.
pub async fn collect(
    api: &dyn AdsApi,
    campaigns: &[CampaignRecord],
    date_preset: DatePreset,
) -> CampaignReport {
    let mut snapshots = Vec::with_capacity(campaigns.len());
    let mut alerts = AlertSet::default();

    for campaign in campaigns {
        info!("Fetching data for: {} ({})", campaign.name, campaign.id);

        let status = match api.fetch_campaign_status(&campaign.id).await {
            Ok(status) => status,
            Err(err) => {
                error!("Error fetching status for {}: {}", campaign.id, err);
                CampaignStatus::Unknown
            }
        };

        let insights = match api.fetch_insights(&campaign.id, date_preset).await {
            Ok(rows) => rows,
            Err(err) => {
                error!("Error fetching insights for {}: {}", campaign.name, err);
                continue;
            }
        };

        let Some(item) = insights.first() else {
            warn!("No data found for {}", campaign.name);
            continue;
        };

        let snapshot = MetricSnapshot::new(campaign, status, item.spend, item.leads());

        if alerts.observe(&snapshot) {
            warn!(
                "ALERT! Campaign '{}' status '{}'",
                snapshot.name, snapshot.status
            );
        }

        info!(
            "{} -> Status: {}, Spend: ${:.2}, Leads: {}, CPL: {}",
            snapshot.name, snapshot.status, snapshot.spend, snapshot.leads, snapshot.cpl
        );

        snapshots.push(snapshot);
    }

    CampaignReport { snapshots, alerts }
}

/// Logs the campaigns that need attention, or that everything is running.
pub fn announce_alerts(alerts: &AlertSet) {
    if alerts.is_empty() {
        info!("All campaigns are running");
        return;
    }

    warn!("{} campaign(s) are not running, please check:", alerts.len());
    for alert in alerts.iter() {
        warn!("- {} ({}) is {}", alert.name, alert.id, alert.status);
    }
}
