//! 🟢 Spotify: the collector that has to assemble its own chart.
//!
//! There is no "top tracks" CSV to download, so we build one:
//!
//! ```text
//!   client credentials ──▶ token
//!   search(year range, market) × pages ──▶ tracks
//!   artists/{id} per distinct artist   ──▶ popularity, genres, followers
//!   audio-features?ids=… in batches     ──▶ danceability, tempo, and friends
//!   inner join on track id, sort by track popularity desc ──▶ one flat CSV
//! ```
//!
//! Column order is the audio features first, then the track and artist
//! metadata. Tracks the feature endpoint knows nothing about are dropped.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::classifier::SourceTag;
use crate::collectors::fetch_text;
use crate::error::ChartError;

// -- 📏 the audio-features endpoint takes at most this many ids per call
const FEATURE_BATCH: usize = 100;

/// 🎛️ Audio feature columns, in output order. `id` is renamed to `track_id`.
const FEATURE_COLUMNS: [(&str, &str); 16] = [
    ("danceability", "danceability"),
    ("energy", "energy"),
    ("key", "key"),
    ("loudness", "loudness"),
    ("mode", "mode"),
    ("speechiness", "speechiness"),
    ("acousticness", "acousticness"),
    ("instrumentalness", "instrumentalness"),
    ("liveness", "liveness"),
    ("valence", "valence"),
    ("tempo", "tempo"),
    ("id", "track_id"),
    ("uri", "uri"),
    ("analysis_url", "analysis_url"),
    ("duration_ms", "duration_ms"),
    ("time_signature", "time_signature"),
];

const META_COLUMNS: [&str; 9] = [
    "artist_id",
    "artist_name",
    "album",
    "track_name",
    "explicit",
    "track_popularity",
    "artist_popularity",
    "artist_genres",
    "artist_followers",
];

#[derive(Debug, Deserialize, Clone)]
pub struct SpotifyCollectorConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How many search results to walk through, in pages of `page_size`.
    #[serde(default = "default_total")]
    pub total: usize,
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}
fn default_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}
fn default_query() -> String {
    "year:2018-2022".to_string()
}
fn default_market() -> String {
    "US".to_string()
}
fn default_page_size() -> usize {
    50
}
fn default_total() -> usize {
    1000
}

impl Default for SpotifyCollectorConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            api_url: default_api_url(),
            client_id: None,
            client_secret: None,
            query: default_query(),
            market: default_market(),
            page_size: default_page_size(),
            total: default_total(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize, Clone)]
struct Track {
    id: String,
    name: String,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    explicit: bool,
    album: Album,
    #[serde(default)]
    artists: Vec<ArtistRef>,
}

#[derive(Debug, Deserialize, Clone)]
struct Album {
    name: String,
}

#[derive(Debug, Deserialize, Clone)]
struct ArtistRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize, Clone)]
struct ArtistProfile {
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    followers: Followers,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct Followers {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<Map<String, Value>>>,
}

fn unavailable(reason: impl std::fmt::Display) -> ChartError {
    ChartError::source_unavailable(SourceTag::Spotify.as_str(), reason)
}

fn api_url(
    config: &SpotifyCollectorConfig,
    path: &str,
    params: &[(&str, &str)],
) -> Result<reqwest::Url, ChartError> {
    let base = format!("{}/{}", config.api_url.trim_end_matches('/'), path);
    let url = if params.is_empty() {
        reqwest::Url::parse(&base)
    } else {
        reqwest::Url::parse_with_params(&base, params)
    };
    url.map_err(unavailable)
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: reqwest::Url,
    token: &str,
) -> Result<T, ChartError> {
    let origin = url.to_string();
    let body = fetch_text(SourceTag::Spotify, client.get(url).bearer_auth(token)).await?;
    serde_json::from_str(&body).map_err(|e| ChartError::malformed(origin, e))
}

/// 🔐 Client-credentials grant. No user, no scopes, just the app.
async fn access_token(
    client: &reqwest::Client,
    config: &SpotifyCollectorConfig,
) -> Result<String, ChartError> {
    let (Some(id), Some(secret)) = (&config.client_id, &config.client_secret) else {
        return Err(unavailable("client_id and client_secret must both be configured"));
    };
    let request = client
        .post(&config.token_url)
        .basic_auth(id, Some(secret))
        .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials");
    let body = fetch_text(SourceTag::Spotify, request).await?;
    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| ChartError::malformed(config.token_url.as_str(), e))?;
    Ok(token.access_token)
}

/// 🔎 Walk the search results page by page. A short page means we hit the end.
async fn search_tracks(
    client: &reqwest::Client,
    config: &SpotifyCollectorConfig,
    token: &str,
) -> Result<Vec<Track>, ChartError> {
    let page_size = config.page_size.max(1);
    let limit = page_size.to_string();
    let mut seen = HashSet::new();
    let mut tracks = Vec::new();
    for offset in (0..config.total).step_by(page_size) {
        let offset = offset.to_string();
        let url = api_url(
            config,
            "search",
            &[
                ("q", config.query.as_str()),
                ("type", "track"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("market", config.market.as_str()),
            ],
        )?;
        let page: SearchResponse = get_json(client, url, token).await?;
        let fetched = page.tracks.items.len();
        debug!("🟢 search offset {} returned {} tracks", offset, fetched);
        tracks.extend(
            page.tracks
                .items
                .into_iter()
                .filter(|track| !track.artists.is_empty() && seen.insert(track.id.clone())),
        );
        if fetched < page_size {
            break;
        }
    }
    Ok(tracks)
}

/// 🎙️ One lookup per distinct lead artist.
async fn artist_profiles(
    client: &reqwest::Client,
    config: &SpotifyCollectorConfig,
    token: &str,
    tracks: &[Track],
) -> Result<HashMap<String, ArtistProfile>, ChartError> {
    let mut profiles = HashMap::new();
    for artist in tracks.iter().filter_map(|t| t.artists.first()) {
        if profiles.contains_key(&artist.id) {
            continue;
        }
        let url = api_url(config, &format!("artists/{}", artist.id), &[])?;
        let profile: ArtistProfile = get_json(client, url, token).await?;
        profiles.insert(artist.id.clone(), profile);
    }
    Ok(profiles)
}

/// 🎛️ Audio features keyed by track id, fetched in batches.
async fn audio_features(
    client: &reqwest::Client,
    config: &SpotifyCollectorConfig,
    token: &str,
    tracks: &[Track],
) -> Result<HashMap<String, Map<String, Value>>, ChartError> {
    let mut features = HashMap::new();
    for batch in tracks.chunks(FEATURE_BATCH) {
        let ids = batch.iter().map(|t| t.id.as_str()).collect::<Vec<_>>().join(",");
        let url = api_url(config, "audio-features", &[("ids", ids.as_str())])?;
        let response: AudioFeaturesResponse = get_json(client, url, token).await?;
        for feature in response.audio_features.into_iter().flatten() {
            if let Some(id) = feature.get("id").and_then(Value::as_str).map(str::to_string) {
                features.insert(id, feature);
            }
        }
    }
    Ok(features)
}

fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 🧾 Join, sort, serialize.
fn render_csv(
    mut tracks: Vec<Track>,
    profiles: &HashMap<String, ArtistProfile>,
    features: &HashMap<String, Map<String, Value>>,
) -> Result<Vec<u8>, ChartError> {
    tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));

    let mut writer = csv::Writer::from_writer(Vec::new());
    let header = FEATURE_COLUMNS
        .iter()
        .map(|(_, column)| *column)
        .chain(META_COLUMNS);
    writer.write_record(header).map_err(unavailable)?;

    let mut rows = 0;
    for track in &tracks {
        let (Some(feature), Some(artist)) = (features.get(&track.id), track.artists.first()) else {
            continue;
        };
        let profile = profiles.get(&artist.id);
        let mut record: Vec<String> = FEATURE_COLUMNS
            .iter()
            .map(|(field, _)| scalar(feature.get(*field)))
            .collect();
        record.extend([
            artist.id.clone(),
            artist.name.clone(),
            track.album.name.clone(),
            track.name.clone(),
            track.explicit.to_string(),
            track.popularity.to_string(),
            profile.map(|p| p.popularity.to_string()).unwrap_or_default(),
            profile
                .map(|p| Value::from(p.genres.clone()).to_string())
                .unwrap_or_default(),
            profile
                .and_then(|p| p.followers.total)
                .map(|total| total.to_string())
                .unwrap_or_default(),
        ]);
        writer.write_record(&record).map_err(unavailable)?;
        rows += 1;
    }
    info!("🟢 assembled {} Spotify rows from {} tracks", rows, tracks.len());
    writer.into_inner().map_err(unavailable)
}

pub(crate) async fn fetch(
    client: &reqwest::Client,
    config: &SpotifyCollectorConfig,
) -> Result<Vec<u8>, ChartError> {
    let token = access_token(client, config).await?;
    let tracks = search_tracks(client, config, &token).await?;
    let profiles = artist_profiles(client, config, &token, &tracks).await?;
    let features = audio_features(client, config, &token, &tracks).await?;
    render_csv(tracks, &profiles, &features)
}
