use crate::table::{Cell, Table};
use std::fmt;

pub const CAMPAIGN_ID: &str = "Campaign ID";
pub const CAMPAIGN_NAME: &str = "Campaign Name";
pub const STATUS: &str = "Status";
pub const SPEND: &str = "Spend";
pub const LEADS: &str = "Leads";
pub const CPL: &str = "CPL";

/// Column layout of a freshly collected report.
pub const REPORT_COLUMNS: [&str; 6] = [CAMPAIGN_ID, CAMPAIGN_NAME, STATUS, SPEND, LEADS, CPL];

/// Columns refreshed from the newest report on every merge.
pub const VOLATILE_COLUMNS: [&str; 4] = [SPEND, LEADS, CPL, STATUS];

/// Action type counted as an outcome.
pub const LEAD_ACTION_TYPE: &str = "lead";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignRecord {
    pub id: String,
    pub name: String,
}

/// Campaign lifecycle state as reported by the ads platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CampaignStatus {
    Active,
    Paused,
    AdvertiserPaused,
    Inactive,
    Unknown,
    Other(String),
}

impl CampaignStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ACTIVE" => CampaignStatus::Active,
            "PAUSED" => CampaignStatus::Paused,
            "ADVERTISER_PAUSED" => CampaignStatus::AdvertiserPaused,
            "INACTIVE" => CampaignStatus::Inactive,
            "UNKNOWN" | "" => CampaignStatus::Unknown,
            other => CampaignStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::AdvertiserPaused => "ADVERTISER_PAUSED",
            CampaignStatus::Inactive => "INACTIVE",
            CampaignStatus::Unknown => "UNKNOWN",
            CampaignStatus::Other(s) => s,
        }
    }

    /// Paused or inactive campaigns need someone to look at them.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Paused | CampaignStatus::AdvertiserPaused | CampaignStatus::Inactive
        )
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricSnapshot {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub spend: f64,
    pub leads: u64,
    pub cpl: f64,
}

impl MetricSnapshot {
    pub fn new(record: &CampaignRecord, status: CampaignStatus, spend: f64, leads: u64) -> Self {
        MetricSnapshot {
            id: record.id.clone(),
            name: record.name.clone(),
            status,
            spend,
            leads,
            cpl: cost_per_lead(spend, leads),
        }
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.id),
            Cell::text(&self.name),
            Cell::text(self.status.as_str()),
            Cell::Decimal(self.spend),
            Cell::Integer(self.leads as i64),
            Cell::Decimal(self.cpl),
        ]
    }
}

/// Spend per lead rounded to cents, half away from zero. Zero leads yields 0.
///
/// Exact halves round up (1/8 gives 0.13), where banker's rounding of the
/// binary value would give 0.12.
pub fn cost_per_lead(spend: f64, leads: u64) -> f64 {
    if leads == 0 {
        return 0.0;
    }
    (spend / leads as f64 * 100.0).round() / 100.0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertSet {
    alerts: Vec<Alert>,
}

impl AlertSet {
    /// Records the snapshot if its status is alert-worthy; returns whether it was.
    pub fn observe(&mut self, snapshot: &MetricSnapshot) -> bool {
        if !snapshot.status.is_alert() {
            return false;
        }
        self.alerts.push(Alert {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            status: snapshot.status.clone(),
        });
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Result of one collection pass, in campaign input order.
#[derive(Clone, Debug, Default)]
pub struct CampaignReport {
    pub snapshots: Vec<MetricSnapshot>,
    pub alerts: AlertSet,
}

impl CampaignReport {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(REPORT_COLUMNS.iter().map(|c| c.to_string()).collect());
        for snapshot in &self.snapshots {
            table.push_row(snapshot.to_row());
        }
        table
    }
}
