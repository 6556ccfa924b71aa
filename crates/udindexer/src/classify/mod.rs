//! Release-name classification: title hints and movie/series decisions.

pub mod release_name;

use std::fmt;
use std::str::FromStr;

pub use release_name::ReleaseNameClassifier;

/// Structured hints pulled out of a release name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleHints {
    pub title: String,
    pub year: Option<u16>,
    pub season: Option<u32>,
    /// Episode numbers in the order they appear.
    pub episodes: Vec<u32>,
    /// Month of a date-based (daily) episode marker.
    pub month: Option<u32>,
}

/// Turns a declared name into title hints. Must be pure.
pub trait TitleClassifier: Send + Sync {
    fn classify(&self, name: &str) -> TitleHints;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "series" => Ok(MediaType::Series),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

/// Outcome of classifying a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<u16>,
    pub season: Option<u32>,
    /// Normalized episode label, e.g. `E02` or `E01E02`.
    pub episode: Option<String>,
}

/// Decides movie vs. series from the hints.
///
/// Any season, month or episode marker makes a series. Series without an
/// explicit season land in season 1.
pub fn classify_release(hints: &TitleHints) -> Classification {
    let is_series = hints.season.is_some() || hints.month.is_some() || !hints.episodes.is_empty();

    if !is_series {
        return Classification {
            media_type: MediaType::Movie,
            title: hints.title.clone(),
            year: hints.year,
            season: None,
            episode: None,
        };
    }

    Classification {
        media_type: MediaType::Series,
        title: hints.title.clone(),
        year: hints.year,
        season: Some(hints.season.unwrap_or(1)),
        episode: episode_label(&hints.episodes),
    }
}

/// Joins episode numbers into one label: `[1, 2]` becomes `E01E02`.
pub fn episode_label(episodes: &[u32]) -> Option<String> {
    if episodes.is_empty() {
        return None;
    }
    Some(episodes.iter().map(|e| format!("E{:02}", e)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_without_markers() {
        let hints = TitleHints {
            title: "Heat".to_string(),
            year: Some(1995),
            ..Default::default()
        };
        let c = classify_release(&hints);
        assert_eq!(c.media_type, MediaType::Movie);
        assert_eq!(c.season, None);
        assert_eq!(c.episode, None);
        assert_eq!(c.year, Some(1995));
    }

    #[test]
    fn test_series_with_season_and_episode() {
        let hints = TitleHints {
            title: "Show".to_string(),
            season: Some(3),
            episodes: vec![7],
            ..Default::default()
        };
        let c = classify_release(&hints);
        assert_eq!(c.media_type, MediaType::Series);
        assert_eq!(c.season, Some(3));
        assert_eq!(c.episode.as_deref(), Some("E07"));
    }

    #[test]
    fn test_episode_only_defaults_to_season_one() {
        let hints = TitleHints {
            title: "Anime".to_string(),
            episodes: vec![12],
            ..Default::default()
        };
        let c = classify_release(&hints);
        assert_eq!(c.media_type, MediaType::Series);
        assert_eq!(c.season, Some(1));
    }

    #[test]
    fn test_month_marker_is_series() {
        let hints = TitleHints {
            title: "Daily Show".to_string(),
            month: Some(5),
            ..Default::default()
        };
        let c = classify_release(&hints);
        assert_eq!(c.media_type, MediaType::Series);
        assert_eq!(c.season, Some(1));
        assert_eq!(c.episode, None);
    }

    #[test]
    fn test_multi_episode_label() {
        assert_eq!(episode_label(&[1, 2]).as_deref(), Some("E01E02"));
        assert_eq!(episode_label(&[9, 10, 11]).as_deref(), Some("E09E10E11"));
        assert_eq!(episode_label(&[]), None);
    }

    #[test]
    fn test_media_type_round_trip_str() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("series".parse::<MediaType>().unwrap(), MediaType::Series);
        assert!("show".parse::<MediaType>().is_err());
    }
}
