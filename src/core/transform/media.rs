//! Media file materialization
//!
//! Attachments are copied into `<exportDir>/media/`. A file already present
//! with the same content is reused; one with different content pushes the new
//! file to the first free `name-N.ext` slot, starting at 2.

use crate::core::verification::checksum::md5_hex_file;
use crate::domain::errors::SubmissionError;
use crate::domain::submission::checked_file_name;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MEDIA_DIR: &str = "media";

/// Copies attachments into the export's media directory
///
/// Copies are serialized: two workers probing for the same free name must
/// not both claim it.
#[derive(Debug)]
pub struct MediaStore {
    media_dir: PathBuf,
    lock: Mutex<()>,
}

impl MediaStore {
    pub fn new(export_dir: &Path) -> Self {
        Self {
            media_dir: export_dir.join(MEDIA_DIR),
            lock: Mutex::new(()),
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Copies `file_name` from `source_dir` and returns its exported path
    ///
    /// The returned path is relative to the export directory
    /// (`media/<file>`). A missing source file is not an error: the path it
    /// would have had is returned without copying anything. A name that is
    /// not a plain file name is rejected before anything is touched.
    pub fn copy(&self, source_dir: &Path, file_name: &str) -> Result<String, SubmissionError> {
        let file_name = checked_file_name(source_dir, file_name)?;
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        std::fs::create_dir_all(&self.media_dir)
            .map_err(|e| SubmissionError::io(&self.media_dir, e))?;

        let source = source_dir.join(file_name);
        let destination = self.media_dir.join(file_name);
        if !source.is_file() {
            tracing::debug!(source = %source.display(), "Media file not found, keeping reference only");
            return Ok(exported_path(file_name));
        }

        let source_hash = md5_hex_file(&source).map_err(|e| SubmissionError::Io {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut sequence = 1;
        let mut candidate_name = file_name.to_string();
        let mut candidate = destination;
        loop {
            if !candidate.exists() {
                std::fs::copy(&source, &candidate).map_err(|e| SubmissionError::io(&candidate, e))?;
                return Ok(exported_path(&candidate_name));
            }

            let existing_hash = md5_hex_file(&candidate).map_err(|e| SubmissionError::Io {
                path: candidate.display().to_string(),
                reason: e.to_string(),
            })?;
            if existing_hash == source_hash {
                return Ok(exported_path(&candidate_name));
            }

            sequence += 1;
            candidate_name = sequenced_name(file_name, sequence);
            candidate = self.media_dir.join(&candidate_name);
        }
    }
}

fn exported_path(file_name: &str) -> String {
    format!("{MEDIA_DIR}/{file_name}")
}

/// `photo.jpg` with sequence 2 becomes `photo-2.jpg`
fn sequenced_name(file_name: &str, sequence: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}-{sequence}.{extension}"),
        _ => format!("{file_name}-{sequence}"),
    }
}
