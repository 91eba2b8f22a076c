use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::models::Snapshot;
use crate::utils::error::Result;

/// File-per-source storage of the last capture.
///
/// Snapshots live at `<dir>/<source_key>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.data_dir)
    }

    pub fn path_for(&self, source_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", source_key))
    }

    fn temp_path_for(&self, source_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", source_key))
    }

    /// Returns `None` when the source has never been saved, which is not the
    /// same as `Some` of an empty snapshot.
    pub fn load(&self, source_key: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(source_key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No snapshot at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&content)?;
        tracing::debug!("Loaded {} items from {}", snapshot.len(), path.display());
        Ok(Some(snapshot))
    }

    /// Replaces the stored snapshot for `source_key`.
    pub fn save(&self, source_key: &str, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(source_key);
        let tmp_path = self.temp_path_for(source_key);

        if let Err(e) = Self::write_file(&tmp_path, snapshot) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                tracing::debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(e);
        }

        // A crash before this point leaves the previous snapshot intact
        fs::rename(&tmp_path, &path)?;

        tracing::debug!("Saved {} items to {}", snapshot.len(), path.display());
        Ok(())
    }

    fn write_file(path: &Path, snapshot: &Snapshot) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}
