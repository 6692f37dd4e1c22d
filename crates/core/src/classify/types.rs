//! Types produced by filename classification.

use serde::{Deserialize, Serialize};

/// Broad media kind inferred from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Episode,
    Unknown,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Episode => "episode",
            MediaKind::Unknown => "unknown",
        }
    }
}

/// Category of bonus content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraCategory {
    Trailer,
    DeletedScene,
    Interview,
    BehindScenes,
    Featurette,
    Extra,
    Commentary,
    Unrated,
}

impl ExtraCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraCategory::Trailer => "trailer",
            ExtraCategory::DeletedScene => "deleted_scene",
            ExtraCategory::Interview => "interview",
            ExtraCategory::BehindScenes => "behind_scenes",
            ExtraCategory::Featurette => "featurette",
            ExtraCategory::Extra => "extra",
            ExtraCategory::Commentary => "commentary",
            ExtraCategory::Unrated => "unrated",
        }
    }

    /// Folder name under `Extras/`: the category name with only its first letter raised.
    pub fn folder_name(&self) -> &'static str {
        match self {
            ExtraCategory::Trailer => "Trailer",
            ExtraCategory::DeletedScene => "Deleted_scene",
            ExtraCategory::Interview => "Interview",
            ExtraCategory::BehindScenes => "Behind_scenes",
            ExtraCategory::Featurette => "Featurette",
            ExtraCategory::Extra => "Extra",
            ExtraCategory::Commentary => "Commentary",
            ExtraCategory::Unrated => "Unrated",
        }
    }
}

/// Season/episode numbering extracted from a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub series: String,
    pub season: u32,
    pub episode: u32,
}

impl EpisodeInfo {
    /// `SxxEyy` tag, zero padded to two digits.
    pub fn tag(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// Everything inferred from one filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedName {
    pub kind: MediaKind,
    pub series: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub extra: Option<ExtraCategory>,
    pub is_sample: bool,
}

impl ClassifiedName {
    pub(crate) fn sample() -> Self {
        Self {
            kind: MediaKind::Unknown,
            series: None,
            season: None,
            episode: None,
            extra: None,
            is_sample: true,
        }
    }

    pub fn is_extra(&self) -> bool {
        self.extra.is_some()
    }

    /// Episode numbering, present only for `MediaKind::Episode`.
    pub fn episode_info(&self) -> Option<EpisodeInfo> {
        match (self.kind, &self.series, self.season, self.episode) {
            (MediaKind::Episode, Some(series), Some(season), Some(episode)) => Some(EpisodeInfo {
                series: series.clone(),
                season,
                episode,
            }),
            _ => None,
        }
    }
}
