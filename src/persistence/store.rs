//! Save file on disk

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use super::codec::{SaveRecord, decode, encode};
use crate::error::PersistError;

/// One save slot at a fixed path
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write the record next to the target, then rename over it
    ///
    /// A crash mid-write leaves the previous save intact.
    pub fn save(&self, record: &SaveRecord) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        let bytes = encode(record);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        log::info!("Saved {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    /// Read the record, `Ok(None)` when there is no save yet
    pub fn load(&self) -> Result<Option<SaveRecord>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record = decode(&bytes)?;
        log::info!(
            "Loaded save from {} (level {}, {} blocks)",
            self.path.display(),
            record.level,
            record.blocks.len()
        );
        Ok(Some(record))
    }

    /// Remove the save file if present
    pub fn delete(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
