//! Episode numbering detection.
//!
//! An ordered table of patterns, first match wins. Explicit `SxxEyy` tags
//! are tried before anything else and win over any movie signal. The looser
//! families after them only run when the name does not read as a movie.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

use super::markers::looks_like_movie;
use super::types::EpisodeInfo;

/// Series name used when a tag is found but nothing precedes it.
pub const UNKNOWN_SERIES: &str = "Unknown Series";

type Extractor = fn(&str, &Captures<'_>) -> Option<(String, u32, u32)>;

struct EpisodePattern {
    name: &'static str,
    regex: Regex,
    extract: Extractor,
}

impl EpisodePattern {
    fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            extract,
        }
    }
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn text(caps: &Captures<'_>, group: usize) -> String {
    caps.get(group)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Groups: series, season, episode.
fn series_season_episode(_: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    Some((text(caps, 1), number(caps, 2)?, number(caps, 3)?))
}

/// Groups: season, episode, series.
fn season_episode_series(_: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    Some((text(caps, 3), number(caps, 1)?, number(caps, 2)?))
}

/// Groups: season, episode; series is whatever precedes the tag.
fn season_episode_prefix(name: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    let start = caps.get(0)?.start();
    Some((name[..start].to_string(), number(caps, 1)?, number(caps, 2)?))
}

/// Groups: series, episode; season 1.
fn series_episode(_: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    Some((text(caps, 1), 1, number(caps, 2)?))
}

/// `Name 205`: season digit then two episode digits, within sane bounds.
fn three_digit(_: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    let season = number(caps, 2)?;
    let episode = number(caps, 3)?;
    let series = normalize_series(&text(caps, 1));
    if (1..=9).contains(&season) && (1..=99).contains(&episode) && series.chars().count() >= 2 {
        Some((series, season, episode))
    } else {
        None
    }
}

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

static DISC_SOURCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:bluray|brrip|dvdrip|webrip|web-dl)").unwrap());

/// `Name - 1073`: absolute numbering, rejecting years and disc rips.
fn trailing_number(name: &str, caps: &Captures<'_>) -> Option<(String, u32, u32)> {
    let digits = caps.get(2)?.as_str();
    if YEAR.is_match(digits) || DISC_SOURCE.is_match(name) {
        return None;
    }
    Some((text(caps, 1), 1, digits.parse().ok()?))
}

static SXXEXX_PATTERNS: Lazy<Vec<EpisodePattern>> = Lazy::new(|| {
    vec![
        EpisodePattern::new(
            "year_before_tag",
            r"(.*?)\.\d{4}\.[Ss](\d{1,2})[Ee](\d{1,2})",
            series_season_episode,
        ),
        EpisodePattern::new(
            "standard",
            r"(.*?)[.\s][Ss](\d{1,2})[Ee](\d{1,2})",
            series_season_episode,
        ),
        EpisodePattern::new(
            "year_in_parens",
            r"(.*?)\(\d{4}\).*?[Ss](\d{1,2})[Ee](\d{1,2})",
            series_season_episode,
        ),
        EpisodePattern::new(
            "reversed",
            r"^[Ss](\d{1,2})[Ee](\d{1,2})[.\s_-]+(.*?)[.\s]",
            season_episode_series,
        ),
        EpisodePattern::new(
            "bare_tag",
            r"[Ss](\d{1,2})\s*[Ee](\d{1,2})",
            season_episode_prefix,
        ),
    ]
});

static OTHER_PATTERNS: Lazy<Vec<EpisodePattern>> = Lazy::new(|| {
    vec![
        EpisodePattern::new(
            "cross",
            r"(?i)^(.*?)(?:[.\s]|^)(\d{1,2})x(\d{2})(?:[.\s]|$)",
            series_season_episode,
        ),
        EpisodePattern::new(
            "spelled_out",
            r"(?i)^(.*?)[.\s]Season[.\s](\d{1,2})[.\s]Episode[.\s](\d{1,2})(?:[.\s]|$)",
            series_season_episode,
        ),
        EpisodePattern::new(
            "dashed",
            r"(?i)^(.*?)\s-\s[Ss](\d{1,2})[Ee](\d{1,2})\s-\s",
            series_season_episode,
        ),
        EpisodePattern::new(
            "split_tag",
            r"(?i)(.*?)[Ss](\d{1,2})[\s.]+[Ee](\d{1,2})",
            series_season_episode,
        ),
        EpisodePattern::new(
            "anime_group",
            r"\][\s.]*([^-\[\]]+?)[\s.]*-[\s.]*(\d{1,2})(?:v\d)?[\s.]*(?:\(|\[)",
            series_episode,
        ),
        EpisodePattern::new(
            "anime_bracket",
            r"(.*?)[\s.]*-[\s.]*(\d{1,2})[\s.]*\[[^\]]*\]",
            series_episode,
        ),
        EpisodePattern::new("bare_dashed", r"^(.*?)\s-\s(\d{1,2})\s-\s", series_episode),
        EpisodePattern::new(
            "three_digit",
            r"^(.*?)(?:[.\s]|^|-\s)(\d)(\d{2})(?:\s-\s|\s|\.)",
            three_digit,
        ),
        EpisodePattern::new(
            "trailing_number",
            r"(.*?)(?:\s-\s|\s)(\d{2,4})(?:\s|$|\[|\(|\.|_)",
            trailing_number,
        ),
    ]
});

static TRAILING_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\s-]+$").unwrap());
static LEADING_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s-]+").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean up a captured series name.
///
/// Dots and underscores become spaces, trailing separator runs and any
/// parenthesized or bracketed annotations are dropped, whitespace collapsed.
pub fn normalize_series(raw: &str) -> String {
    let spaced = raw.replace(['.', '_'], " ");
    let stripped = TRAILING_SEPARATORS.replace(&spaced, "");
    let stripped = PARENTHESIZED.replace_all(&stripped, "");
    let stripped = BRACKETED.replace_all(&stripped, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    let collapsed = TRAILING_SEPARATORS.replace(&collapsed, "");
    LEADING_SEPARATORS.replace(&collapsed, "").into_owned()
}

fn first_match(patterns: &[EpisodePattern], name: &str) -> Option<(&'static str, EpisodeInfo)> {
    patterns.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(name)?;
        let (series, season, episode) = (pattern.extract)(name, &caps)?;
        let series = normalize_series(&series);
        let series = if series.is_empty() {
            UNKNOWN_SERIES.to_string()
        } else {
            series
        };
        Some((
            pattern.name,
            EpisodeInfo {
                series,
                season,
                episode,
            },
        ))
    })
}

/// Episode numbering of `name`, or `None` for movies and unrecognized names.
pub fn parse_episode(name: &str) -> Option<EpisodeInfo> {
    parse_episode_with_pattern(name).map(|(_, info)| info)
}

/// Like [`parse_episode`], also naming the pattern that matched.
pub fn parse_episode_with_pattern(name: &str) -> Option<(&'static str, EpisodeInfo)> {
    if let Some(hit) = first_match(&SXXEXX_PATTERNS, name) {
        return Some(hit);
    }
    if looks_like_movie(name) {
        return None;
    }
    first_match(&OTHER_PATTERNS, name)
}
