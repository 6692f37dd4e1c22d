//! Sample, extras and movie/TV marker detection.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::ExtraCategory;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

fn any_match(regexes: &[Regex], name: &str) -> bool {
    regexes.iter().any(|re| re.is_match(name))
}

static SAMPLE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)[-_.\s]sample[-_.\s]",
        r"(?i)^sample[-_.\s]",
        r"(?i)[-_.\s]sample$",
        r"(?i)sample\.",
        r"(?i)[\[(]sample[\])]",
    ])
});

/// Full-length variant releases that mention extras vocabulary.
static EXTRAS_EXEMPT: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)extended[.\s]+(cut|edition|version)",
        r"(?i)[.\s]extended[.\s]+",
        r"(?i)[.\s]extended$",
        r"(?i)extended[.\s]+(bluray|uhd|2160p|1080p)",
        r"(?i)unrated[.\s]+(cut|edition|bluray|uhd|2160p|1080p)",
    ])
});

/// Checked in order, first category with a hit wins.
static EXTRAS: Lazy<Vec<(ExtraCategory, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            ExtraCategory::Trailer,
            compile(&[
                r"(?i)[-_.\s]trailer[-_.\s]",
                r"(?i)[-_.\s]teaser[-_.\s]",
                r"(?i)[\[(]trailer[\])]",
            ]),
        ),
        (
            ExtraCategory::DeletedScene,
            compile(&[
                r"(?i)[-_.\s]deleted[-_.\s]scene",
                r"(?i)[-_.\s]deleted[-_.\s]",
                r"(?i)[-_.\s]removal[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::Interview,
            compile(&[
                r"(?i)[-_.\s]interview[-_.\s]",
                r"(?i)[-_.\s]cast[-_.\s]",
                r"(?i)[-_.\s]press[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::BehindScenes,
            compile(&[
                r"(?i)[-_.\s]behind[-_.\s]the[-_.\s]scenes[-_.\s]",
                r"(?i)[-_.\s]making[-_.\s]of[-_.\s]",
                r"(?i)[-_.\s]bts[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::Featurette,
            compile(&[
                r"(?i)[-_.\s]featurette[-_.\s]",
                r"(?i)[-_.\s]short[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::Extra,
            compile(&[
                r"(?i)[-_.\s](extra|extras)[-_.\s]",
                r"(?i)[-_.\s]bonus[-_.\s](feature|content|material)",
                r"(?i)[-_.\s]special[-_.\s]feature[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::Commentary,
            compile(&[
                r"(?i)[-_.\s]commentary[-_.\s]",
                r"(?i)[-_.\s]blooper[-_.\s]",
                r"(?i)[-_.\s]gag[-_.\s]reel[-_.\s]",
            ]),
        ),
        (
            ExtraCategory::Unrated,
            compile(&[
                r"(?i)[-_.\s]unrated[-_.\s]scene",
                r"(?i)[-_.\s]uncensored[-_.\s]scene",
            ]),
        ),
    ]
});

static MOVIE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\((?:19|20)\d{2}\)",
        r"\[(?:19|20)\d{2}\]",
        r"(?i)(?:19|20)\d{2}[.\s][^S\d]",
        r"(?i)(?:bluray|brrip|dvdrip|remux|webrip|web-dl).+(?:19|20)\d{2}",
        r"(?i)(?:19|20)\d{2}.+(?:bluray|brrip|dvdrip|remux|webrip|web-dl)",
        r"(?i)(?:2160p|1080p|720p).+(?:bluray|brrip|remux|dvdrip)",
        r"(?i)(?:uhd|hdr10|hdr|dv).+(?:19|20)\d{2}",
        r"(?i)(?:hybrid|extended|directors).+(?:cut|edition)",
        r"(?i)(?:x264|x265|hevc|xvid|divx|avc)",
        r"(?i)(?:aac|dd5|dts|dolby|atmos|truehd)",
    ])
});

static TV_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"[Ss]\d{1,2}[Ee]\d{1,2}",
        r"(?i)season",
        r"(?i)episode",
        r"(?i)complete",
    ])
});

/// Looser signal used only to spread torrents over worker pools.
static MOVIE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:19|20)\d{2}|bluray|brrip|dvdrip|remux|webrip|web-dl|2160p|1080p|720p")
        .unwrap()
});

/// Whether `name` is a sample clip.
pub fn is_sample(name: &str) -> bool {
    any_match(&SAMPLE, name)
}

/// Extras category of `name`, if it is bonus content.
///
/// Extended and unrated releases are never extras.
pub fn extra_category(name: &str) -> Option<ExtraCategory> {
    if any_match(&EXTRAS_EXEMPT, name) {
        return None;
    }
    EXTRAS
        .iter()
        .find(|(_, patterns)| any_match(patterns, name))
        .map(|(category, _)| *category)
}

pub fn has_movie_markers(name: &str) -> bool {
    any_match(&MOVIE_MARKERS, name)
}

pub fn has_tv_markers(name: &str) -> bool {
    any_match(&TV_MARKERS, name)
}

/// Movie signals present and no TV vocabulary alongside them.
pub fn looks_like_movie(name: &str) -> bool {
    has_movie_markers(name) && !has_tv_markers(name)
}

pub(crate) fn has_movie_hint(name: &str) -> bool {
    MOVIE_HINT.is_match(name)
}
