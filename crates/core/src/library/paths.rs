//! Library layout.
//!
//! ```text
//! <root>/TV Shows/<Series>/Season <N>/<Series>.SxxEyy.strm
//! <root>/TV Shows/<Series>/Extras/<Category>/<Series>.SxxEyy_extra_<category>.strm
//! <root>/Movies/<Base>/<Base>.strm
//! <root>/Movies/<Base>/Extras/<Category>/<Base>_extra_<category>.strm
//! ```

use std::path::{Path, PathBuf};

use crate::classify::{ClassifiedName, UNKNOWN_SERIES};

pub const TV_DIR: &str = "TV Shows";
pub const MOVIES_DIR: &str = "Movies";
pub const EXTRAS_DIR: &str = "Extras";
pub const REFERENCE_EXTENSION: &str = "strm";

/// Keep alphanumerics, space, `.`, `_` and `-`; strip trailing whitespace.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Filename without its media extension.
fn stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
}

/// Where a reference file for `filename` belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    /// Full path of the reference file.
    pub path: PathBuf,
    /// Top-level category folder (`TV Shows` or `Movies`) scanned for duplicates.
    pub category_root: PathBuf,
    /// `SxxEyy` token narrowing the duplicate scan, for episodes.
    pub episode_tag: Option<String>,
}

/// Compute the target path of `filename` under `root`.
///
/// `index` suffixes the movie base name when a torrent has several links.
pub fn target_path(
    root: &Path,
    filename: &str,
    classified: &ClassifiedName,
    index: Option<usize>,
) -> TargetPath {
    if let Some(info) = classified.episode_info() {
        let series = match sanitize_filename(&info.series) {
            s if s.is_empty() => UNKNOWN_SERIES.to_string(),
            s => s,
        };
        let tag = info.tag();
        let category_root = root.join(TV_DIR);
        let series_dir = category_root.join(&series);

        let path = match classified.extra {
            Some(extra) => series_dir
                .join(EXTRAS_DIR)
                .join(extra.folder_name())
                .join(format!(
                    "{}.{}_extra_{}.{}",
                    series,
                    tag,
                    extra.as_str(),
                    REFERENCE_EXTENSION
                )),
            None => series_dir
                .join(format!("Season {}", info.season))
                .join(format!("{}.{}.{}", series, tag, REFERENCE_EXTENSION)),
        };

        return TargetPath {
            path,
            category_root,
            episode_tag: Some(tag),
        };
    }

    let mut base = sanitize_filename(stem(filename));
    if base.is_empty() {
        base = "Untitled".to_string();
    }
    if let Some(index) = index {
        base = format!("{}_{}", base, index);
    }

    let category_root = root.join(MOVIES_DIR);
    let movie_dir = category_root.join(&base);
    let path = match classified.extra {
        Some(extra) => movie_dir
            .join(EXTRAS_DIR)
            .join(extra.folder_name())
            .join(format!(
                "{}_extra_{}.{}",
                base,
                extra.as_str(),
                REFERENCE_EXTENSION
            )),
        None => movie_dir.join(format!("{}.{}", base, REFERENCE_EXTENSION)),
    };

    TargetPath {
        path,
        category_root,
        episode_tag: None,
    }
}
