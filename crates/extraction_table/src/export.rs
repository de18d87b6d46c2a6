use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::csv::is_csv_error;
use crate::error::ExportError;

pub const DEFAULT_CSV_FILENAME: &str = "extraction_data.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    /// The requested directory was unusable and the file went to the
    /// system temp directory instead.
    pub used_fallback: bool,
}

/// Saves CSV text as `dir/filename`.
///
/// The content is staged in a temporary file next to the target and
/// persisted under the final name, so a failed write leaves nothing behind.
/// Falls back to the system temp directory when `dir` cannot be written.
pub fn save_csv(csv: &str, dir: &Path, filename: &str) -> Result<ExportedFile, ExportError> {
    if is_csv_error(csv) {
        return Err(ExportError::ErrorContent(csv.to_string()));
    }
    let filename = match filename.trim() {
        "" => DEFAULT_CSV_FILENAME,
        name => name,
    };

    match write_staged(dir, filename, csv) {
        Ok(path) => {
            info!(path = %path.display(), "saved csv export");
            Ok(ExportedFile {
                path,
                used_fallback: false,
            })
        }
        Err(err) => {
            warn!(dir = %dir.display(), "csv export failed, using temp dir: {err}");
            let path = write_staged(&std::env::temp_dir(), filename, csv)?;
            info!(path = %path.display(), "saved csv export to fallback location");
            Ok(ExportedFile {
                path,
                used_fallback: true,
            })
        }
    }
}

fn write_staged(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf, ExportError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ExportError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let target = dir.join(filename);
    let mut staged = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    staged
        .write_all(contents.as_bytes())
        .map_err(io_err(staged.path()))?;
    staged
        .persist(&target)
        .map_err(|err| ExportError::Io {
            path: target.clone(),
            source: err.error,
        })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn writes_csv_to_requested_dir() {
        let dir = tempdir().expect("tempdir");
        let saved = save_csv("\"A\"\n\"1\"", dir.path(), "").expect("save");
        assert_eq!(saved.path, dir.path().join(DEFAULT_CSV_FILENAME));
        assert!(!saved.used_fallback);
        assert_eq!(fs::read_to_string(&saved.path).expect("read"), "\"A\"\n\"1\"");
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }

    #[test]
    fn falls_back_when_dir_is_unusable() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").expect("write blocker");

        let filename = format!("export-{}.csv", std::process::id());
        let saved = save_csv("\"A\"", &blocker.join("nested"), &filename).expect("save");
        assert!(saved.used_fallback);
        assert!(saved.path.starts_with(std::env::temp_dir()));
        fs::remove_file(&saved.path).expect("cleanup");
    }

    #[test]
    fn refuses_error_content() {
        let dir = tempdir().expect("tempdir");
        let err = save_csv("Error generating CSV: boom", dir.path(), "x.csv")
            .expect_err("must fail");
        assert!(matches!(err, ExportError::ErrorContent(_)));
    }
}
