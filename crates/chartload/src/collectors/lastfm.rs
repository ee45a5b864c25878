//! 🎧 Last.fm: `geo.gettoptracks` for one country, landed verbatim.

use serde::Deserialize;

use crate::classifier::SourceTag;
use crate::collectors::fetch_text;
use crate::error::ChartError;

#[derive(Debug, Deserialize, Clone)]
pub struct LastFmCollectorConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// 🔐 Required to collect. Not required to consolidate.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_url() -> String {
    "http://ws.audioscrobbler.com/2.0/".to_string()
}

fn default_country() -> String {
    "united states".to_string()
}

fn default_limit() -> u32 {
    200
}

impl Default for LastFmCollectorConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            country: default_country(),
            limit: default_limit(),
        }
    }
}

pub(crate) async fn fetch(
    client: &reqwest::Client,
    config: &LastFmCollectorConfig,
) -> Result<Vec<u8>, ChartError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| ChartError::source_unavailable(SourceTag::LastFm.as_str(), "no api_key configured"))?;
    let limit = config.limit.to_string();
    let url = reqwest::Url::parse_with_params(
        &config.url,
        &[
            ("api_key", api_key),
            ("format", "json"),
            ("method", "geo.gettoptracks"),
            ("country", config.country.as_str()),
            ("limit", limit.as_str()),
            ("page", "1"),
        ],
    )
    .map_err(|e| ChartError::source_unavailable(SourceTag::LastFm.as_str(), e))?;

    let body = fetch_text(SourceTag::LastFm, client.get(url)).await?;
    // -- 🧐 land JSON or nothing. a captive-portal HTML page is not a chart.
    serde_json::from_str::<serde_json::Value>(&body)
        .map_err(|e| ChartError::malformed(config.url.as_str(), format!("response is not JSON: {e}")))?;
    Ok(body.into_bytes())
}
