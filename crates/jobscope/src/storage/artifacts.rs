use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::error::StorageError;

const MAX_SUFFIX: u32 = 1000;

/// Per-extraction files written next to the database: the raw posting
/// text and the canonical record as pretty JSON.
pub struct ArtifactStore {
    output_directory: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// File stamp for one extraction, e.g. `2025-01-31_14-05-09`.
    pub fn stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        at.format("%Y-%m-%d_%H-%M-%S").to_string()
    }

    pub fn stamp_now() -> String {
        Self::stamp(&Local::now())
    }

    /// Writes `job_<stamp>_raw.txt`.
    pub fn save_raw(&self, stamp: &str, text: &str) -> Result<PathBuf, StorageError> {
        self.write_new(&format!("job_{}_raw", stamp), "txt", text.as_bytes())
    }

    /// Writes `job_<stamp>_structured.json`.
    pub fn save_structured<T: Serialize>(
        &self,
        stamp: &str,
        value: &T,
    ) -> Result<PathBuf, StorageError> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write_new(&format!("job_{}_structured", stamp), "json", &json)
    }

    /// Creates `<base>.<ext>` exclusively, falling back to `<base>_2.<ext>`,
    /// `<base>_3.<ext>`, ... when the name is taken.
    fn write_new(&self, base: &str, ext: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_directory()?;

        for counter in 1..=MAX_SUFFIX {
            let filename = if counter == 1 {
                format!("{}.{}", base, ext)
            } else {
                format!("{}_{}.{}", base, counter, ext)
            };
            let path = self.output_directory.join(filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    fill_or_discard(file, &path, content)?;
                    log::debug!("Wrote artifact {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }

        Err(StorageError::FileExists(
            self.output_directory.join(format!("{}.{}", base, ext)),
        ))
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.output_directory).map_err(|e| {
            StorageError::CreateDirectory {
                path: self.output_directory.clone(),
                source: e,
            }
        })
    }
}

/// Writes `content` into a freshly created file. A failed write removes
/// the partial file so it does not hold a suffix slot.
fn fill_or_discard<W: Write>(
    mut file: W,
    path: &Path,
    content: &[u8],
) -> Result<(), StorageError> {
    let written = file.write_all(content).and_then(|()| file.flush());
    drop(file);
    written.map_err(|e| {
        if let Err(remove) = std::fs::remove_file(path) {
            log::warn!("Could not remove partial artifact {}: {}", path.display(), remove);
        }
        StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_stamp_format() {
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 14, 5, 9).unwrap();
        assert_eq!(ArtifactStore::stamp(&at), "2025-01-31_14-05-09");
    }

    #[test]
    fn test_save_raw_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested/out"));

        let path = store.save_raw("2025-01-31_14-05-09", "Senior Rust Engineer").unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "job_2025-01-31_14-05-09_raw.txt"
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Senior Rust Engineer");
    }

    #[test]
    fn test_save_structured_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let path = store
            .save_structured("stamp", &serde_json::json!({ "source_url": "https://x.example/1" }))
            .unwrap();

        assert!(path.ends_with("job_stamp_structured.json"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"source_url\""));
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = store.save_raw("stamp", "one").unwrap();
        let second = store.save_raw("stamp", "two").unwrap();
        let third = store.save_raw("stamp", "three").unwrap();

        assert!(first.ends_with("job_stamp_raw.txt"));
        assert!(second.ends_with("job_stamp_raw_2.txt"));
        assert!(third.ends_with("job_stamp_raw_3.txt"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "one");
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = ArtifactStore::new(blocker.join("out"));
        let result = store.save_raw("stamp", "text");
        assert!(matches!(result, Err(StorageError::CreateDirectory { .. })));
    }

    /// Accepts a few bytes, then fails like a full disk.
    struct FullDisk {
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job_stamp_raw.txt");
        std::fs::write(&path, "").unwrap();

        let result = fill_or_discard(FullDisk { room: 4 }, &path, b"Senior Rust Engineer");

        assert!(matches!(result, Err(StorageError::WriteFile { .. })));
        assert!(!path.exists());

        let store = ArtifactStore::new(dir.path());
        let next = store.save_raw("stamp", "retry").unwrap();
        assert!(next.ends_with("job_stamp_raw.txt"));
    }
}
