//! 🎧 Last.fm: the one that needed a chiropractor.
//!
//! The `geo.gettoptracks` payload looks like this:
//!
//! ```json
//! { "tracks": { "track": [ {
//!     "name": "Flowers", "duration": "0", "listeners": "123", "mbid": "", "url": "...",
//!     "streamable": { "#text": "0", "fulltrack": "0" },
//!     "artist": { "name": "Miley Cyrus", "mbid": "...", "url": "..." },
//!     "image": [ { "#text": "...", "size": "small" } ],
//!     "@attr": { "rank": "0" }
//! } ] } }
//! ```
//!
//! Each track gets flattened: `artist` becomes `artist_name`/`artist_mbid`/`artist_url`,
//! `@attr` becomes `attr_rank`, `streamable` becomes `streamable_text`/`streamable_fulltrack`,
//! and `image` goes in the bin. The nested shapes are typed structs with optional
//! fields, so a missing one is a named `MalformedRecord` rather than a surprise.
//! Nothing gets a made-up default. Fabricated ranks corrupt analytics. 🦆

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::classifier::SourceTag;
use crate::common::{Cell, Table};
use crate::error::ChartError;
use crate::normalizers::{NormalizeOptions, Normalizer};

/// 📦 Top level. `tracks` may be missing entirely, which means "no tracks".
#[derive(Debug, Deserialize)]
struct LastFmChart {
    #[serde(default)]
    tracks: Option<LastFmTracks>,
    // -- 💀 the API answers errors with a 200 and these two fields
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LastFmTracks {
    #[serde(default)]
    track: OneOrMany,
}

/// 🎲 A one-track chart comes back as a bare object instead of a list of one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_vec(self) -> Vec<Value> {
        match self {
            OneOrMany::Many(tracks) => tracks,
            OneOrMany::One(Value::Null) => Vec::new(),
            OneOrMany::One(track) => vec![track],
        }
    }
}

/// 🎵 One track, with its nested shapes spelled out and everything else kept flat.
#[derive(Debug, Deserialize)]
struct LastFmTrack {
    #[serde(default)]
    artist: Option<LastFmArtist>,
    #[serde(default, rename = "@attr")]
    attr: Option<LastFmRankAttr>,
    #[serde(default)]
    streamable: Option<LastFmStreamable>,
    // -- 🗑️ thumbnails nobody downstream ever looked at
    #[serde(default)]
    #[allow(dead_code)]
    image: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct LastFmArtist {
    name: Option<Scalar>,
    mbid: Option<Scalar>,
    url: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct LastFmRankAttr {
    rank: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct LastFmStreamable {
    #[serde(rename = "#text")]
    text: Option<Scalar>,
    fulltrack: Option<Scalar>,
}

/// 🔢 Last.fm quotes its numbers, mostly. This accepts either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Scalar {
    fn into_cell(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

/// 📍 A raw track plus where it came from, for error messages that point somewhere.
#[derive(Debug, Clone)]
pub(crate) struct RawTrack {
    origin: String,
    position: usize,
    body: Value,
}

/// 🎧 Marker type for the Last.fm top-tracks JSON.
pub(crate) struct LastFmJson;

impl Normalizer for LastFmJson {
    const SOURCE: SourceTag = SourceTag::LastFm;
    type Parsed = Vec<RawTrack>;

    fn parse_file(origin: &str, content: &str) -> Result<Vec<RawTrack>, ChartError> {
        let chart: LastFmChart =
            serde_json::from_str(content).map_err(|e| ChartError::malformed(origin, e))?;
        if let Some(code) = &chart.error {
            warn!(
                "🎧 {} holds a Last.fm error payload ({}: {}), treating it as no tracks",
                origin,
                code,
                chart.message.as_deref().unwrap_or("no message")
            );
        }
        let tracks = chart.tracks.unwrap_or_default().track.into_vec();
        Ok(tracks
            .into_iter()
            .enumerate()
            .map(|(position, body)| RawTrack {
                origin: origin.to_string(),
                position,
                body,
            })
            .collect())
    }

    fn concat(mut acc: Vec<RawTrack>, next: Vec<RawTrack>) -> Vec<RawTrack> {
        acc.extend(next);
        acc
    }

    fn normalize(parsed: Vec<RawTrack>, options: NormalizeOptions) -> Result<Table, ChartError> {
        let mut table = Table::default();
        for raw in parsed {
            match flatten_track(&raw) {
                Ok(record) => table.push_record(record),
                Err(e) if options.skip_malformed_records => {
                    warn!("🩹 skipping malformed Last.fm record: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(table)
    }
}

/// 🪗 Flatten one track into (column, value) pairs.
fn flatten_track(raw: &RawTrack) -> Result<Vec<(String, Cell)>, ChartError> {
    let where_ = || format!("{} (track #{})", raw.origin, raw.position);
    let track: LastFmTrack =
        serde_json::from_value(raw.body.clone()).map_err(|e| ChartError::malformed(where_(), e))?;

    let missing = |field: &str| ChartError::malformed(where_(), format!("missing `{field}`"));
    let artist = track.artist.ok_or_else(|| missing("artist"))?;
    let attr = track.attr.ok_or_else(|| missing("@attr"))?;
    let streamable = track.streamable.ok_or_else(|| missing("streamable"))?;

    let mut record: Vec<(String, Cell)> = track
        .rest
        .into_iter()
        .map(|(column, value)| (column, scalar_cell(value)))
        .collect();

    let derived = [
        ("artist_name", artist.name, "artist.name"),
        ("artist_mbid", artist.mbid, "artist.mbid"),
        ("artist_url", artist.url, "artist.url"),
        ("attr_rank", attr.rank, "@attr.rank"),
        ("streamable_text", streamable.text, "streamable.#text"),
        ("streamable_fulltrack", streamable.fulltrack, "streamable.fulltrack"),
    ];
    for (column, value, path) in derived {
        let value = value.ok_or_else(|| missing(path))?;
        record.push((column.to_string(), Some(value.into_cell())));
    }
    Ok(record)
}

/// 🧱 Top-level leftovers: strings stay strings, null stays null, anything nested becomes JSON text.
fn scalar_cell(value: Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}
