//! 🏷️ File Classifier: "which chart did you come from, little file?"
//!
//! Landed files don't carry metadata. They carry a name, and the name is the
//! whole passport: `2024/1/8/shazam_2024-01-08.csv`. This module reads the
//! passport and stamps a [`SourceTag`], or waves the file past as
//! unrecognized (the watermark itself, a stray README, whatever else lives in
//! the bucket). Unrecognized is not an error. It is forward compatibility. 🦆

use serde::Deserialize;

/// 🎵 The three chart sources this pipeline knows. Closed set. No freestyling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Shazam,
    #[serde(rename = "lastfm")]
    LastFm,
    Spotify,
}

impl SourceTag {
    /// 📋 Every tag, in classification priority order.
    pub const ALL: [SourceTag; 3] = [SourceTag::LastFm, SourceTag::Shazam, SourceTag::Spotify];

    /// 🏷️ The name used in file names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Shazam => "shazam",
            SourceTag::LastFm => "lastfm",
            SourceTag::Spotify => "spotify",
        }
    }

    /// 🗄️ The destination warehouse table. Note the underscore in `last_fm`:
    /// the table was named before anybody agreed on how to spell the service.
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceTag::Shazam => "shazam",
            SourceTag::LastFm => "last_fm",
            SourceTag::Spotify => "spotify",
        }
    }

    /// 📄 The extension a landed file of this source carries (before any `.gz`).
    pub fn extension(&self) -> &'static str {
        match self {
            SourceTag::Shazam | SourceTag::Spotify => "csv",
            SourceTag::LastFm => "json",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            SourceTag::Shazam => "shazam_",
            SourceTag::LastFm => "lastfm_",
            SourceTag::Spotify => "spotify_",
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        let without_gz = file_name.strip_suffix(".gz").unwrap_or(file_name);
        let Some(stem) = without_gz
            .strip_suffix(self.extension())
            .and_then(|s| s.strip_suffix('.'))
        else {
            return false;
        };
        stem.contains(self.marker())
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 🔎 Classify a storage key by its file name component.
///
/// Total and deterministic: every key maps to exactly one answer, and
/// `None` means unrecognized. First match in [`SourceTag::ALL`] order wins.
pub fn classify(key: &str) -> Option<SourceTag> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    SourceTag::ALL.into_iter().find(|tag| tag.matches(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_every_landed_file_finds_its_people() {
        assert_eq!(
            classify("2024/1/8/shazam_2024-01-08.csv"),
            Some(SourceTag::Shazam)
        );
        assert_eq!(
            classify("2024/1/8/lastfm_2024-01-08.json"),
            Some(SourceTag::LastFm)
        );
        assert_eq!(
            classify("2024/1/8/spotify_2024-01-08.csv"),
            Some(SourceTag::Spotify)
        );
        assert_eq!(classify("shazam_2024-01-01.csv"), Some(SourceTag::Shazam));
    }

    #[test]
    fn the_one_where_gzipped_landings_still_get_their_stamp() {
        assert_eq!(
            classify("2024/1/8/lastfm_2024-01-08.json.gz"),
            Some(SourceTag::LastFm)
        );
        assert_eq!(
            classify("2024/1/8/shazam_2024-01-08.csv.gz"),
            Some(SourceTag::Shazam)
        );
    }

    #[test]
    fn the_one_where_strangers_in_the_bucket_are_politely_ignored() {
        assert_eq!(classify("metadata/watermark.txt"), None);
        assert_eq!(classify("2024/1/8/README.md"), None);
        assert_eq!(classify("2024/1/8/shazam_2024-01-08.json"), None);
        assert_eq!(classify("2024/1/8/lastfm_2024-01-08.csv"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn the_one_where_the_directory_cannot_impersonate_the_file() {
        // 🕵️ only the last path segment counts
        assert_eq!(classify("shazam_archive/notes.csv"), None);
        assert_eq!(classify("spotify_2024/1/8/lastfm_2024-01-08.json"), Some(SourceTag::LastFm));
    }

    #[test]
    fn the_one_where_the_patterns_never_fight_over_a_valid_name() {
        for tag in SourceTag::ALL {
            let name = format!("2024/1/8/{}_2024-01-08.{}", tag.as_str(), tag.extension());
            let claimants: Vec<_> = SourceTag::ALL
                .into_iter()
                .filter(|t| t.matches(name.rsplit('/').next().unwrap_or(&name)))
                .collect();
            assert_eq!(claimants, vec![tag], "{name} should have exactly one owner");
            assert_eq!(classify(&name), classify(&name), "classify must be deterministic");
        }
    }

    #[test]
    fn the_one_where_tags_know_their_table_names() {
        assert_eq!(SourceTag::LastFm.table_name(), "last_fm");
        assert_eq!(SourceTag::Shazam.table_name(), "shazam");
        assert_eq!(SourceTag::Spotify.table_name(), "spotify");
        assert_eq!(format!("{}", SourceTag::LastFm), "lastfm");
    }
}
