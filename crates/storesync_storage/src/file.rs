//! File-backed log.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a [`FileBackend`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create if missing, exclusive lock, appends allowed.
    ReadWrite,
    /// Existing file only, shared lock, appends rejected.
    ReadOnly,
}

/// A log stored in a single file.
///
/// The file is locked for the lifetime of the backend: exclusively for
/// [`OpenMode::ReadWrite`], shared for [`OpenMode::ReadOnly`]. Inspection
/// tools can therefore read a log only while no device process writes it.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    mode: OpenMode,
    file: Mutex<File>,
    size: u64,
}

impl FileBackend {
    /// Opens (creating if needed) a writable log, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another process holds the file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_mode(path, OpenMode::ReadWrite)
    }

    /// Opens an existing log for reading.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        Self::open_with_mode(path, OpenMode::ReadOnly)
    }

    /// Opens a log in the given mode.
    pub fn open_with_mode(path: &Path, mode: OpenMode) -> StorageResult<Self> {
        let file = match mode {
            OpenMode::ReadWrite => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)?
            }
            OpenMode::ReadOnly => OpenOptions::new().read(true).open(path)?,
        };

        let locked = match mode {
            OpenMode::ReadWrite => FileExt::try_lock_exclusive(&file),
            OpenMode::ReadOnly => FileExt::try_lock_shared(&file),
        };
        if locked.is_err() {
            return Err(StorageError::Locked {
                path: path.display().to_string(),
            });
        }

        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            mode,
            file: Mutex::new(file),
            size,
        })
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the mode the log was opened with.
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        match self.mode {
            OpenMode::ReadWrite => Ok(()),
            OpenMode::ReadOnly => Err(StorageError::ReadOnly),
        }
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let end = offset.saturating_add(len as u64);
        if end > self.size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.size,
            });
        }
        let mut buffer = vec![0u8; len];
        if len > 0 {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.ensure_writable()?;
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_data()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.ensure_writable()?;
        if new_size > self.size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size: self.size,
            });
        }
        let file = self.file.get_mut();
        file.set_len(new_size)?;
        file.sync_all()?;
        self.size = new_size;
        Ok(())
    }
}
