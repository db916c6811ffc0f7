//! Entry files under the cache directory.
//!
//! Writes go to a temp file in the same directory and are renamed into place,
//! so a reader sees either the previous entry or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cache path {path:?} is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("could not {action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> PersistError + 'a {
    move |source| PersistError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Creates `dir` (and parents) unless it already exists as a directory.
pub fn ensure_cache_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(io_error("create", dir))
        }
        Err(err) => Err(io_error("inspect", dir)(err)),
    }
}

/// A directory of named entries. Concurrent writers to one entry are
/// last-writer-wins.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// `Ok(None)` when the entry does not exist.
    pub fn read(&self, name: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_of(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &path)(err)),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_cache_dir(&self.root)?;

        let target = self.path_of(name);
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_error("stage", &self.root))?;
        let staged = tmp.path().to_path_buf();
        tmp.write_all(content.as_bytes())
            .map_err(io_error("write", &staged))?;
        tmp.as_file_mut()
            .sync_all()
            .map_err(io_error("sync", &staged))?;
        tmp.persist(&target)
            .map_err(|err| io_error("replace", &target)(err.error))?;
        Ok(target)
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, name: &str) -> Result<bool, PersistError> {
        let path = self.path_of(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error("remove", &path)(err)),
        }
    }
}
