use crate::error::{ProdTotalError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Folder-addressed file storage for report files.
pub trait ReportStore {
    /// Newest first.
    fn list(&self, folder_id: &str) -> Result<Vec<StoredReport>>;

    /// Store `bytes` under `name` and return the new file id.
    fn upload(&self, folder_id: &str, name: &str, bytes: &[u8]) -> Result<String>;

    fn download(&self, folder_id: &str, file_id: &str) -> Result<Vec<u8>>;
}

/// Stores each folder as a subdirectory of `root`. File ids are file names.
pub struct LocalFolderStore {
    root: PathBuf,
    overwrite: bool,
    buffer_size: usize,
}

impl LocalFolderStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            overwrite: false,
            buffer_size: 64 * 1024,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upload a local file under its own name, keeping its modification time.
    pub fn upload_file(&self, folder_id: &str, source: &Path) -> Result<String> {
        if !source.is_file() {
            return Err(ProdTotalError::InvalidPath {
                path: format!("Source is not a file: {}", source.display()),
            });
        }

        let name = source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ProdTotalError::InvalidPath {
                path: source.display().to_string(),
            })?;

        let bytes = fs::read(source)?;
        let file_id = self.upload(folder_id, name, &bytes)?;

        match fs::metadata(source).and_then(|m| m.modified()) {
            Ok(modified_time) => {
                let dest = self.folder_path(folder_id)?.join(&file_id);
                let mtime = filetime::FileTime::from_system_time(modified_time);
                if let Err(e) = filetime::set_file_mtime(&dest, mtime) {
                    tracing::warn!(path = %dest.display(), error = %e, "could not preserve modification time");
                }
            }
            Err(e) => {
                tracing::warn!(path = %source.display(), error = %e, "source modification time unavailable");
            }
        }

        Ok(file_id)
    }

    fn folder_path(&self, folder_id: &str) -> Result<PathBuf> {
        validate_component(folder_id)?;
        Ok(self.root.join(folder_id))
    }

    fn existing_folder(&self, folder_id: &str) -> Result<PathBuf> {
        let folder = self.folder_path(folder_id)?;
        if !folder.is_dir() {
            return Err(ProdTotalError::FolderNotFound {
                folder: folder.display().to_string(),
            });
        }
        Ok(folder)
    }

    fn write_atomically(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let file_name = dest
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ProdTotalError::InvalidPath {
                path: dest.display().to_string(),
            })?;
        // Dot-prefixed so listings never show a half-written report
        let partial = dest.with_file_name(format!(".{}.partial", file_name));

        {
            let file = fs::File::create(&partial)?;
            let mut writer = BufWriter::with_capacity(self.buffer_size, file);
            writer.write_all(bytes)?;
            writer.flush()?;
        }

        fs::rename(&partial, dest).inspect_err(|_| {
            let _ = fs::remove_file(&partial);
        })?;

        Ok(())
    }
}

impl ReportStore for LocalFolderStore {
    fn list(&self, folder_id: &str) -> Result<Vec<StoredReport>> {
        let folder = self.existing_folder(folder_id)?;
        let mut reports = Vec::new();

        for entry in WalkDir::new(&folder).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| ProdTotalError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                tracing::debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };

            let metadata = entry.metadata().map_err(|e| ProdTotalError::Io(e.into()))?;
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            reports.push(StoredReport {
                id: name.to_string(),
                name: name.to_string(),
                folder: folder_id.to_string(),
                size: metadata.len(),
                modified,
            });
        }

        reports.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(reports)
    }

    fn upload(&self, folder_id: &str, name: &str, bytes: &[u8]) -> Result<String> {
        validate_component(name)?;
        let folder = self.folder_path(folder_id)?;
        fs::create_dir_all(&folder)?;

        let dest = folder.join(name);
        if dest.exists() && !self.overwrite {
            return Err(ProdTotalError::ReportExists {
                path: dest.display().to_string(),
            });
        }

        self.write_atomically(&dest, bytes)?;
        tracing::info!(folder = folder_id, file = name, bytes = bytes.len(), "report stored");

        Ok(name.to_string())
    }

    fn download(&self, folder_id: &str, file_id: &str) -> Result<Vec<u8>> {
        validate_component(file_id)?;
        let path = self.existing_folder(folder_id)?.join(file_id);

        if !path.is_file() {
            return Err(ProdTotalError::ReportNotFound {
                folder: folder_id.to_string(),
                file_id: file_id.to_string(),
            });
        }

        let bytes = fs::read(&path)?;
        tracing::info!(folder = folder_id, file = file_id, bytes = bytes.len(), "report fetched");
        Ok(bytes)
    }
}

/// Folder ids and file names must be a single plain path component.
fn validate_component(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(ProdTotalError::InvalidPath {
            path: format!("{}: {}", reason, name),
        })
    };

    if name.is_empty() || name == "." || name == ".." {
        return invalid("Not a file name");
    }

    if name.len() > 255 {
        return invalid("Name too long");
    }

    if name.contains('/') || name.contains('\\') {
        return invalid("Path separators not allowed");
    }

    let invalid_chars = ['<', '>', ':', '"', '|', '?', '*'];
    if name.chars().any(|c| invalid_chars.contains(&c) || c.is_control()) {
        return invalid("Name contains invalid characters");
    }

    if name.ends_with(' ') || name.ends_with('.') {
        return invalid("Name cannot end with space or dot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_then_download() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        let id = store.upload("convenio", "jan.csv", b"Nome;Valor\nA;1,00\n").unwrap();
        assert_eq!(id, "jan.csv");

        let bytes = store.download("convenio", &id).unwrap();
        assert_eq!(bytes, b"Nome;Valor\nA;1,00\n");
    }

    #[test]
    fn test_upload_refuses_to_replace() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        store.upload("unidade", "jan.csv", b"first").unwrap();
        let result = store.upload("unidade", "jan.csv", b"second");
        assert!(matches!(result, Err(ProdTotalError::ReportExists { .. })));

        let store = store.with_overwrite(true);
        store.upload("unidade", "jan.csv", b"second").unwrap();
        assert_eq!(store.download("unidade", "jan.csv").unwrap(), b"second");
    }

    #[test]
    fn test_list_skips_directories_and_reports_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        store.upload("convenio", "a.csv", b"12345").unwrap();
        store.upload("convenio", "b.csv", b"1").unwrap();
        fs::create_dir_all(temp_dir.path().join("convenio").join("archive")).unwrap();

        let reports = store.list("convenio").unwrap();
        assert_eq!(reports.len(), 2);
        let a = reports.iter().find(|r| r.name == "a.csv").unwrap();
        assert_eq!(a.size, 5);
        assert_eq!(a.folder, "convenio");
    }

    #[test]
    fn test_list_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        store.upload("convenio", "old.csv", b"x").unwrap();
        store.upload("convenio", "new.csv", b"x").unwrap();
        let folder = temp_dir.path().join("convenio");
        filetime::set_file_mtime(folder.join("old.csv"), filetime::FileTime::from_unix_time(1_000_000, 0)).unwrap();
        filetime::set_file_mtime(folder.join("new.csv"), filetime::FileTime::from_unix_time(2_000_000, 0)).unwrap();

        let names: Vec<_> = store.list("convenio").unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["new.csv", "old.csv"]);
    }

    #[test]
    fn test_missing_folder_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        assert!(matches!(store.list("nowhere"), Err(ProdTotalError::FolderNotFound { .. })));

        store.upload("convenio", "a.csv", b"x").unwrap();
        assert!(matches!(
            store.download("convenio", "b.csv"),
            Err(ProdTotalError::ReportNotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalFolderStore::new(temp_dir.path());

        assert!(store.upload("..", "a.csv", b"x").is_err());
        assert!(store.upload("convenio", "../a.csv", b"x").is_err());
        assert!(store.download("convenio", "..").is_err());
    }

    #[test]
    fn test_upload_file_preserves_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("fev.csv");
        fs::write(&source, b"Nome;Valor\n").unwrap();
        filetime::set_file_mtime(&source, filetime::FileTime::from_unix_time(1_500_000_000, 0)).unwrap();

        let store = LocalFolderStore::new(temp_dir.path().join("store"));
        let id = store.upload_file("unidade", &source).unwrap();

        assert!(store.root().join("unidade").join(&id).is_file());

        let stored = store.list("unidade").unwrap();
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].modified.timestamp(), 1_500_000_000);
    }
}
