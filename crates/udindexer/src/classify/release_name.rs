use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{TitleClassifier, TitleHints};

static RE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mkv|mp4|avi|m4v|ts|wmv|mpg|nzb)$").unwrap());
static RE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bS(\d{1,3})[ .-]?E(\d{1,3})((?:[ .-]?E\d{1,3})*)(?:-(\d{1,3})\b)?").unwrap()
});
static RE_EPISODE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)E(\d{1,3})").unwrap());
static RE_CROSS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})\b").unwrap());
static RE_SEASON_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:S|Season[ .-]?)(\d{1,2})\b").unwrap());
static RE_EPISODE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:E|Ep|Episode[ .-]?)(\d{1,3})\b").unwrap());
static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})[ .-](\d{2})[ .-](\d{2})\b").unwrap());
static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());
static RE_QUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(480p|576p|720p|1080p|2160p|4k|web[ .-]?dl|webrip|bluray|blu[ .-]ray|hdtv|dvdrip|brrip|x264|x265|h\.?264|h\.?265|hevc|remux|proper|repack|complete)\b",
    )
    .unwrap()
});

/// Upper bound on a single episode range, e.g. `S01E01-24`.
const MAX_EPISODE_RANGE: u32 = 50;

/// Scene-style release name classifier (`Show.Name.S01E02.720p...`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseNameClassifier;

impl ReleaseNameClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl TitleClassifier for ReleaseNameClassifier {
    fn classify(&self, name: &str) -> TitleHints {
        let normalized = name.trim().replace('_', ".");
        let normalized = RE_EXTENSION.replace(&normalized, "").to_string();

        let mut hints = TitleHints::default();
        let mut title_end = normalized.len();
        let mut mark = |start: usize| title_end = title_end.min(start);

        if let Some(caps) = RE_SEASON_EPISODE.captures(&normalized) {
            mark(whole_start(&caps));
            hints.season = number(&caps, 1);
            hints.episodes = season_episode_numbers(&caps);
        } else if let Some(caps) = RE_CROSS.captures(&normalized) {
            mark(whole_start(&caps));
            hints.season = number(&caps, 1);
            hints.episodes.extend(number(&caps, 2));
        } else {
            if let Some(caps) = RE_SEASON_ONLY.captures(&normalized) {
                mark(whole_start(&caps));
                hints.season = number(&caps, 1);
            }
            if let Some(caps) = RE_EPISODE_ONLY.captures(&normalized) {
                mark(whole_start(&caps));
                hints.episodes.extend(number(&caps, 1));
            }
        }

        if let Some(caps) = RE_DATE.captures(&normalized) {
            let month = number(&caps, 2).filter(|m| (1..=12).contains(m));
            if month.is_some() {
                mark(whole_start(&caps));
                hints.month = month;
                hints.year = number(&caps, 1).and_then(|y| u16::try_from(y).ok());
            }
        }

        if hints.year.is_none() {
            // A leading year is part of the title (e.g. "1917").
            if let Some(m) = RE_YEAR
                .captures_iter(&normalized)
                .filter_map(|c| c.get(1))
                .filter(|m| m.start() > 0)
                .last()
            {
                mark(m.start());
                hints.year = m.as_str().parse().ok();
            }
        }

        if let Some(m) = RE_QUALITY.find(&normalized) {
            mark(m.start());
        }

        let title = clean_title(&normalized[..title_end]);
        hints.title = if title.is_empty() {
            clean_title(&normalized)
        } else {
            title
        };

        hints
    }
}

fn whole_start(caps: &Captures<'_>) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(0)
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

fn season_episode_numbers(caps: &Captures<'_>) -> Vec<u32> {
    let mut episodes: Vec<u32> = number(caps, 2).into_iter().collect();

    if let Some(extra) = caps.get(3) {
        episodes.extend(
            RE_EPISODE_NUMBER
                .captures_iter(extra.as_str())
                .filter_map(|c| number(&c, 1)),
        );
    }

    // `S01E01-03` is a range.
    if let (Some(&last), Some(end)) = (episodes.last(), number(caps, 4)) {
        if end > last && end - last <= MAX_EPISODE_RANGE {
            episodes.extend(last + 1..=end);
        }
    }

    episodes
}

fn clean_title(raw: &str) -> String {
    let spaced = raw.replace('.', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == '-' || c == '(' || c == '[' || c.is_whitespace())
        .trim()
        .to_string()
}
