use crate::config::{Config, DatePreset};
use crate::error::Error;
use crate::report::{CampaignStatus, LEAD_ACTION_TYPE};
use log::warn;
use reqwest::{Client, Url};
use serde::{de, Deserialize, Deserializer};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AdsApi: Send + Sync + 'static {
    /// Fetches the lifecycle status of a campaign.
    /// # Returns
    /// `CampaignStatus::Unknown` when the response carries no status field,
    /// an Error when the request fails or the API answers with a non-2xx status.
    async fn fetch_campaign_status(&self, campaign_id: &str) -> Result<CampaignStatus, Error>;

    /// Fetches aggregated campaign insights for the given reporting window.
    /// # Arguments
    /// * `campaign_id` - The campaign to fetch insights for.
    /// * `date_preset` - The reporting window.
    /// # Returns
    /// The insight rows the API returned, possibly none, or an Error for a
    /// failed request or non-2xx response.
    async fn fetch_insights(
        &self,
        campaign_id: &str,
        date_preset: DatePreset,
    ) -> Result<Vec<Insights>, Error>;
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Insights {
    #[serde(default, deserialize_with = "de_amount")]
    pub spend: f64,
    #[serde(default)]
    pub actions: Vec<ActionCount>,
}

impl Insights {
    /// Count of the lead action, 0 when the platform reported none.
    ///
    /// Only the lead entry is interpreted; values of other action types are
    /// never parsed.
    pub fn leads(&self) -> u64 {
        let Some(action) = self
            .actions
            .iter()
            .find(|a| a.action_type == LEAD_ACTION_TYPE)
        else {
            return 0;
        };

        match action.value.as_ref().and_then(NumberOrText::as_count) {
            Some(count) => count,
            None => {
                warn!("Unusable lead count {:?}, reporting 0 leads", action.value);
                0
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ActionCount {
    pub action_type: String,
    #[serde(default)]
    pub value: Option<NumberOrText>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: Option<String>,
}

#[derive(Deserialize)]
struct InsightsResponse {
    #[serde(default)]
    data: Vec<Insights>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// The Graph API serialises numbers as strings; both forms are accepted.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    /// Non-negative whole number, if the value is one.
    pub fn as_count(&self) -> Option<u64> {
        let value = match self {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(s) => s.trim().parse().ok()?,
        };
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return None;
        }
        Some(value as u64)
    }
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

#[derive(Clone)]
pub struct GraphApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GraphApiClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(GraphApiClient {
            client: Client::new(),
            base_url: config.graph_api_url.to_string(),
            token: config.access_token()?.to_string(),
        })
    }

    fn campaign_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::UrlParsingFailed(url::ParseError::SetHostOnCannotBeABaseUrl))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("access_token", &self.token);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl AdsApi for GraphApiClient {
    async fn fetch_campaign_status(&self, campaign_id: &str) -> Result<CampaignStatus, Error> {
        let mut url = self.campaign_url(&[campaign_id])?;
        url.query_pairs_mut().append_pair("fields", "status");

        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body = resp.json::<StatusResponse>().await?;

        Ok(body
            .status
            .map(|s| CampaignStatus::parse(&s))
            .unwrap_or(CampaignStatus::Unknown))
    }

    async fn fetch_insights(
        &self,
        campaign_id: &str,
        date_preset: DatePreset,
    ) -> Result<Vec<Insights>, Error> {
        let mut url = self.campaign_url(&[campaign_id, "insights"])?;
        url.query_pairs_mut()
            .append_pair("fields", "spend,actions")
            .append_pair("date_preset", date_preset.as_str())
            .append_pair("level", "campaign");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown error".to_string());

            return Err(Error::Provider {
                campaign_id: campaign_id.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.json::<InsightsResponse>().await?;
        Ok(body.data)
    }
}
