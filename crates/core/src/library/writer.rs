//! Reference file writer.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::error::LibraryError;
use super::paths::{target_path, REFERENCE_EXTENSION};
use crate::classify::{classify, ClassifiedName};
use crate::metrics;

/// Writer behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct LibraryOptions {
    /// Report extras as skipped instead of filing them under `Extras/`.
    pub skip_extras: bool,
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new or changed reference file was written.
    Written(PathBuf),
    /// The target already held this URL.
    Unchanged(PathBuf),
    /// Another file in the same category already holds this URL.
    Duplicate { existing: PathBuf },
    /// Bonus content, not written because extras are skipped.
    SkippedExtra,
    /// Sample clips are never written.
    SkippedSample,
}

impl SaveOutcome {
    /// Path of the file now holding the URL, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SaveOutcome::Written(path) | SaveOutcome::Unchanged(path) => Some(path),
            SaveOutcome::Duplicate { existing } => Some(existing),
            SaveOutcome::SkippedExtra | SaveOutcome::SkippedSample => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveOutcome::Written(_) => "written",
            SaveOutcome::Unchanged(_) => "unchanged",
            SaveOutcome::Duplicate { .. } => "duplicate",
            SaveOutcome::SkippedExtra => "skipped_extra",
            SaveOutcome::SkippedSample => "skipped_sample",
        }
    }
}

/// Writes one reference file per resolved link under a library root.
#[derive(Debug, Clone)]
pub struct LibraryWriter {
    root: PathBuf,
    options: LibraryOptions,
}

impl LibraryWriter {
    pub fn new(root: impl Into<PathBuf>, options: LibraryOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classify `filename` and save `url` at its library path.
    pub async fn save(
        &self,
        filename: &str,
        url: &str,
        index: Option<usize>,
    ) -> Result<SaveOutcome, LibraryError> {
        let classified = classify(filename);
        self.save_classified(filename, &classified, url, index).await
    }

    /// Save with a classification computed by the caller.
    pub async fn save_classified(
        &self,
        filename: &str,
        classified: &ClassifiedName,
        url: &str,
        index: Option<usize>,
    ) -> Result<SaveOutcome, LibraryError> {
        let outcome = self.place(filename, classified, url, index).await;
        let label = match &outcome {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "failed",
        };
        metrics::LIBRARY_WRITES.with_label_values(&[label]).inc();
        outcome
    }

    async fn place(
        &self,
        filename: &str,
        classified: &ClassifiedName,
        url: &str,
        index: Option<usize>,
    ) -> Result<SaveOutcome, LibraryError> {
        if classified.is_sample {
            return Ok(SaveOutcome::SkippedSample);
        }
        if classified.is_extra() && self.options.skip_extras {
            debug!(filename = %filename, "Skipping extra");
            return Ok(SaveOutcome::SkippedExtra);
        }

        let url = url.trim();
        if url.is_empty() {
            return Err(LibraryError::EmptyUrl {
                filename: filename.to_string(),
            });
        }

        let target = target_path(&self.root, filename, classified, index);

        if let Ok(existing) = fs::read_to_string(&target.path).await {
            if existing.trim() == url {
                debug!(path = %target.path.display(), "Reference file unchanged");
                return Ok(SaveOutcome::Unchanged(target.path));
            }
        }

        if let Some(existing) =
            find_equivalent(&target.category_root, target.episode_tag.as_deref(), url).await?
        {
            if existing != target.path {
                info!(
                    path = %target.path.display(),
                    existing = %existing.display(),
                    "Equivalent reference file exists, skipping"
                );
                return Ok(SaveOutcome::Duplicate { existing });
            }
        }

        if let Some(parent) = target.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LibraryError::directory_creation_failed(parent.to_path_buf(), e))?;
        }

        // Write then rename so an interrupted run never leaves a truncated file
        let tmp = target
            .path
            .with_extension(format!("{}.tmp", REFERENCE_EXTENSION));
        fs::write(&tmp, url)
            .await
            .map_err(|e| LibraryError::write_failed(tmp.clone(), e))?;
        fs::rename(&tmp, &target.path)
            .await
            .map_err(|e| LibraryError::write_failed(target.path.clone(), e))?;

        debug!(path = %target.path.display(), "Reference file written");
        Ok(SaveOutcome::Written(target.path))
    }
}

/// First reference file under `category_root` whose content equals `url`.
///
/// Episodes only compare files whose name carries the same `SxxEyy` tag.
async fn find_equivalent(
    category_root: &Path,
    episode_tag: Option<&str>,
    url: &str,
) -> Result<Option<PathBuf>, LibraryError> {
    let root = category_root.to_path_buf();
    let tag = episode_tag.map(str::to_string);
    let url = url.to_string();

    tokio::task::spawn_blocking(move || scan_for_url(&root, tag.as_deref(), &url))
        .await
        .map_err(|e| LibraryError::ScanFailed(e.to_string()))
}

fn scan_for_url(root: &Path, tag: Option<&str>, url: &str) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|e| e.to_str()) == Some(REFERENCE_EXTENSION)
        })
        .filter(|entry| match tag {
            Some(tag) => entry.file_name().to_string_lossy().contains(tag),
            None => true,
        })
        .find(|entry| {
            std::fs::read_to_string(entry.path())
                .map(|content| content.trim() == url)
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn writer(temp: &TempDir) -> LibraryWriter {
        LibraryWriter::new(temp.path(), LibraryOptions::default())
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let writer = writer(&temp);

        let first = writer
            .save("Series.Name.S01E02.1080p.mkv", "https://cdn/1", None)
            .await
            .unwrap();
        let SaveOutcome::Written(path) = first else {
            panic!("expected a write, got {:?}", first);
        };
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://cdn/1");

        let second = writer
            .save("Series.Name.S01E02.1080p.mkv", "https://cdn/1", None)
            .await
            .unwrap();
        assert_eq!(second, SaveOutcome::Unchanged(path.clone()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://cdn/1");

        let files: Vec<_> = WalkDir::new(temp.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_changed_url_rewrites() {
        let temp = TempDir::new().unwrap();
        let writer = writer(&temp);

        writer
            .save("Movie.Name.2023.1080p.BluRay.x264.mkv", "https://cdn/old", None)
            .await
            .unwrap();
        let outcome = writer
            .save("Movie.Name.2023.1080p.BluRay.x264.mkv", "https://cdn/new", None)
            .await
            .unwrap();

        let path = outcome.path().unwrap();
        assert!(matches!(outcome, SaveOutcome::Written(_)));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "https://cdn/new");
    }

    #[tokio::test]
    async fn test_leftover_partial_write_replaced() {
        let temp = TempDir::new().unwrap();
        let season = temp.path().join("TV Shows/Show Name/Season 1");
        std::fs::create_dir_all(&season).unwrap();
        std::fs::write(season.join("Show Name.S01E04.strm.tmp"), "https://cd").unwrap();

        let outcome = writer(&temp)
            .save("Show.Name.S01E04.mkv", "https://cdn/full", None)
            .await
            .unwrap();

        let SaveOutcome::Written(path) = outcome else {
            panic!("expected a write, got {:?}", outcome);
        };
        assert_eq!(path, season.join("Show Name.S01E04.strm"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://cdn/full");

        let names: Vec<_> = std::fs::read_dir(&season)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Show Name.S01E04.strm"]);
    }

    #[tokio::test]
    async fn test_duplicate_across_series_folders() {
        let temp = TempDir::new().unwrap();
        let tv = temp.path().join("TV Shows");
        let first = tv.join("Show A/Season 1/Show A.S01E02.strm");
        let second = tv.join("Show B/Season 1/Show B.S01E02.strm");
        for path in [&first, &second] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "https://cdn/same").unwrap();
        }

        let outcome = writer(&temp)
            .save("Show.C.S01E02.720p.mkv", "https://cdn/same", None)
            .await
            .unwrap();

        match outcome {
            SaveOutcome::Duplicate { existing } => {
                assert!(existing == first || existing == second);
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert!(!tv.join("Show C").exists());
    }

    #[tokio::test]
    async fn test_episode_scan_narrowed_by_tag() {
        let temp = TempDir::new().unwrap();
        let other = temp.path().join("TV Shows/Show A/Season 1/Show A.S01E03.strm");
        std::fs::create_dir_all(other.parent().unwrap()).unwrap();
        std::fs::write(&other, "https://cdn/same").unwrap();

        let outcome = writer(&temp)
            .save("Show.B.S01E02.mkv", "https://cdn/same", None)
            .await
            .unwrap();
        assert!(matches!(outcome, SaveOutcome::Written(_)));
    }

    #[tokio::test]
    async fn test_movie_duplicate_anywhere_in_movies() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("Movies/Old Name/Old Name.strm");
        std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
        std::fs::write(&existing, "https://cdn/movie\n").unwrap();

        let outcome = writer(&temp)
            .save("Movie.Name.2023.1080p.BluRay.x264.mkv", "https://cdn/movie", None)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Duplicate { existing });
    }

    #[tokio::test]
    async fn test_extras_filed_or_skipped() {
        let temp = TempDir::new().unwrap();
        let filed = writer(&temp)
            .save("Movie.2020.Trailer.mkv", "https://cdn/trailer", None)
            .await
            .unwrap();
        assert!(filed
            .path()
            .unwrap()
            .to_string_lossy()
            .contains("Extras/Trailer"));

        let skipping = LibraryWriter::new(temp.path(), LibraryOptions { skip_extras: true });
        let skipped = skipping
            .save("Other.2021.Trailer.mkv", "https://cdn/trailer2", None)
            .await
            .unwrap();
        assert_eq!(skipped, SaveOutcome::SkippedExtra);
    }

    #[tokio::test]
    async fn test_samples_never_written() {
        let temp = TempDir::new().unwrap();
        let outcome = writer(&temp)
            .save("Movie.2020.1080p-sample-grp.mkv", "https://cdn/s", None)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::SkippedSample);
        assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let temp = TempDir::new().unwrap();
        let result = writer(&temp).save("Movie.2020.mkv", "  ", None).await;
        assert!(matches!(result, Err(LibraryError::EmptyUrl { .. })));
    }
}
