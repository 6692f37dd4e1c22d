//! Library writer.
//!
//! Maps a classified filename and its resolved URL onto a deterministic
//! path under the library root and writes a one-line reference file there,
//! skipping the write when an equivalent file already exists.

mod error;
mod paths;
mod writer;

pub use error::LibraryError;
pub use paths::{
    sanitize_filename, target_path, TargetPath, EXTRAS_DIR, MOVIES_DIR, REFERENCE_EXTENSION,
    TV_DIR,
};
pub use writer::{LibraryOptions, LibraryWriter, SaveOutcome};
