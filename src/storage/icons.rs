use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Extension used when the content type does not identify an image format
pub const DEFAULT_ICON_EXTENSION: &str = "ico";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("cannot derive a file name from host '{0}'")]
    BadHost(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Maps a response `Content-Type` to an icon file extension
///
/// Parameters (`; charset=...`) are ignored. Unknown or missing types fall back
/// to [`DEFAULT_ICON_EXTENSION`].
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "image/png" => "png",
        "image/x-icon" | "image/vnd.microsoft.icon" | "image/ico" | "image/icon" => "ico",
        "image/svg+xml" => "svg",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        _ => DEFAULT_ICON_EXTENSION,
    }
}

/// Turns a hostname into a safe file stem
///
/// IPv6 literals and anything outside `[a-z0-9.-]` are replaced with `_`.
fn file_stem_for_host(host: &str) -> Result<String, PersistError> {
    let stem: String = host
        .trim_matches(|c| c == '[' || c == ']')
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        return Err(PersistError::BadHost(host.to_string()));
    }
    Ok(stem)
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes icon files as `{dir}/{hostname}.{ext}`
///
/// Each write goes to a temp file in the same directory and is then renamed over
/// the target, so a reader never sees a partially written icon. A recurring
/// hostname overwrites the earlier file.
#[derive(Debug, Clone)]
pub struct IconStore {
    dir: PathBuf,
}

impl IconStore {
    pub fn new(dir: PathBuf) -> Result<Self, PersistError> {
        ensure_output_dir(&dir)?;
        Ok(Self { dir })
    }

    /// Path an icon for `host` with `content_type` would be written to
    pub fn path_for(&self, host: &str, content_type: Option<&str>) -> Result<PathBuf, PersistError> {
        let stem = file_stem_for_host(host)?;
        let ext = extension_for_content_type(content_type);
        Ok(self.dir.join(format!("{}.{}", stem, ext)))
    }

    /// Atomically writes the icon bytes and returns the final path
    pub fn save(
        &self,
        host: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<PathBuf, PersistError> {
        let target = self.path_for(host, content_type)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for_content_type(Some("image/png")), "png");
        assert_eq!(extension_for_content_type(Some("image/x-icon")), "ico");
        assert_eq!(
            extension_for_content_type(Some("image/vnd.microsoft.icon")),
            "ico"
        );
        assert_eq!(
            extension_for_content_type(Some("image/svg+xml; charset=utf-8")),
            "svg"
        );
        assert_eq!(extension_for_content_type(Some("IMAGE/JPEG")), "jpg");
    }

    #[test]
    fn test_ambiguous_type_defaults_to_ico() {
        assert_eq!(extension_for_content_type(None), "ico");
        assert_eq!(
            extension_for_content_type(Some("application/octet-stream")),
            "ico"
        );
        assert_eq!(extension_for_content_type(Some("")), "ico");
    }

    #[test]
    fn test_file_stem_for_host() {
        assert_eq!(file_stem_for_host("Example.COM").unwrap(), "example.com");
        assert_eq!(file_stem_for_host("[::1]").unwrap(), "__1");
        assert!(file_stem_for_host("").is_err());
    }

    #[test]
    fn test_save_writes_named_file() {
        let dir = TempDir::new().unwrap();
        let store = IconStore::new(dir.path().join("icons")).unwrap();

        let path = store
            .save("example.com", Some("image/png"), b"\x89PNG")
            .unwrap();

        assert_eq!(path, dir.path().join("icons").join("example.com.png"));
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_save_overwrites_same_host() {
        let dir = TempDir::new().unwrap();
        let store = IconStore::new(dir.path().to_path_buf()).unwrap();

        store.save("example.com", Some("image/x-icon"), b"one").unwrap();
        let path = store.save("example.com", Some("image/x-icon"), b"two").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"two");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_new_rejects_file_as_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            IconStore::new(file.path().to_path_buf()),
            Err(PersistError::OutputDir(_))
        ));
    }
}
