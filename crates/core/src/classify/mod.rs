//! Filename classification.
//!
//! Pure functions that infer what a release filename is: a TV episode with
//! its numbering, a movie, or something unknown, plus whether it is a sample
//! clip or bonus content. Nothing here touches the network or disk.

mod episode;
mod markers;
mod types;

pub use episode::{normalize_series, parse_episode, parse_episode_with_pattern, UNKNOWN_SERIES};
pub use markers::{extra_category, has_movie_markers, has_tv_markers, is_sample, looks_like_movie};
pub use types::*;

/// Classify a filename.
///
/// Samples short-circuit: nothing else is inferred for them.
pub fn classify(filename: &str) -> ClassifiedName {
    if is_sample(filename) {
        return ClassifiedName::sample();
    }

    let extra = extra_category(filename);

    if let Some(info) = parse_episode(filename) {
        return ClassifiedName {
            kind: MediaKind::Episode,
            series: Some(info.series),
            season: Some(info.season),
            episode: Some(info.episode),
            extra,
            is_sample: false,
        };
    }

    let kind = if looks_like_movie(filename) {
        MediaKind::Movie
    } else {
        MediaKind::Unknown
    };

    ClassifiedName {
        kind,
        series: None,
        season: None,
        episode: None,
        extra,
        is_sample: false,
    }
}

/// Cheap bucket guess for a torrent name, used to size worker pools.
///
/// Looser than [`classify`]: any year, source or resolution tag counts as
/// a movie hint.
pub fn precategorize(name: &str) -> MediaKind {
    if parse_episode(name).is_some() {
        MediaKind::Episode
    } else if markers::has_movie_hint(name) {
        MediaKind::Movie
    } else {
        MediaKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_canonical_episode() {
        let classified = classify("Series.Name.S01E02.1080p");
        assert_eq!(classified.kind, MediaKind::Episode);
        assert_eq!(classified.series.as_deref(), Some("Series Name"));
        assert_eq!(classified.season, Some(1));
        assert_eq!(classified.episode, Some(2));
        assert!(!classified.is_sample);
        assert!(!classified.is_extra());
    }

    #[test]
    fn test_classify_sample_short_circuits() {
        let classified = classify("Series.Name.S01E02.1080p-sample-grp.mkv");
        assert!(classified.is_sample);
        assert_eq!(classified.kind, MediaKind::Unknown);
        assert!(classified.series.is_none());
    }

    #[test]
    fn test_classify_movie() {
        let classified = classify("Movie.Name.2023.1080p.BluRay.x264");
        assert_eq!(classified.kind, MediaKind::Movie);
        assert!(classified.episode_info().is_none());
    }

    #[test]
    fn test_extended_cut_is_not_extra() {
        let classified = classify("Show.Name.S01.Extended.Cut.1080p");
        assert!(!classified.is_extra());
    }

    #[test]
    fn test_episode_extra_keeps_numbering() {
        let classified = classify("Show.Name.S02E05.Deleted.Scenes.mkv");
        assert_eq!(classified.kind, MediaKind::Episode);
        assert_eq!(classified.extra, Some(ExtraCategory::DeletedScene));
        assert_eq!(classified.episode_info().unwrap().tag(), "S02E05");
    }

    #[test]
    fn test_unknown_when_no_signal() {
        let classified = classify("random_home_video.mkv");
        assert_eq!(classified.kind, MediaKind::Unknown);
    }

    #[test]
    fn test_precategorize() {
        assert_eq!(precategorize("Show.S01E01.720p"), MediaKind::Episode);
        assert_eq!(precategorize("Some Film 2015"), MediaKind::Movie);
        assert_eq!(precategorize("Holiday Pictures"), MediaKind::Unknown);
    }
}
