//! 🎤 Shazam: the top-200 chart as a CSV download.
//!
//! The file opens with two lines of preamble (chart title, export date) before
//! the real header. We cut those and land the rest as-is.

use serde::Deserialize;

use crate::classifier::SourceTag;
use crate::collectors::fetch_text;
use crate::error::ChartError;

const DEFAULT_URL: &str = "https://www.shazam.com/services/charts/csv/top-200/united-states";
// -- ✂️ title line + date line. the header is line three.
const PREAMBLE_LINES: usize = 2;

#[derive(Debug, Deserialize, Clone)]
pub struct ShazamCollectorConfig {
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

impl Default for ShazamCollectorConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

/// ✂️ Drop the preamble. A download with nothing after it is not a chart.
pub(crate) fn strip_preamble(origin: &str, body: &str) -> Result<String, ChartError> {
    let chart: Vec<&str> = body.lines().skip(PREAMBLE_LINES).collect();
    if chart.iter().all(|line| line.trim().is_empty()) {
        return Err(ChartError::malformed(
            origin,
            format!("expected a header after {PREAMBLE_LINES} preamble lines, found nothing"),
        ));
    }
    let mut csv = chart.join("\n");
    csv.push('\n');
    Ok(csv)
}

pub(crate) async fn fetch(
    client: &reqwest::Client,
    config: &ShazamCollectorConfig,
) -> Result<Vec<u8>, ChartError> {
    let body = fetch_text(SourceTag::Shazam, client.get(&config.url)).await?;
    Ok(strip_preamble(&config.url, &body)?.into_bytes())
}
