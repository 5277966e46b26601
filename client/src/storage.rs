//! [`Storage`] of the last issued token.

use std::{
    fmt, fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use derive_more::{Display, Error, From};
use parking_lot::Mutex;

/// Persistent storage of the last issued token.
pub trait Storage: fmt::Debug + Send + Sync {
    /// Loads the persisted token, if any.
    ///
    /// # Errors
    ///
    /// If the [`Storage`] cannot be read.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Persists the provided `token`, replacing the previous one.
    ///
    /// # Errors
    ///
    /// If the [`Storage`] cannot be written.
    fn store(&self, token: &str) -> Result<(), StorageError>;

    /// Removes the persisted token, if any.
    ///
    /// # Errors
    ///
    /// If the [`Storage`] cannot be written.
    fn remove(&self) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn load(&self) -> Result<Option<String>, StorageError> {
        (**self).load()
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        (**self).store(token)
    }

    fn remove(&self) -> Result<(), StorageError> {
        (**self).remove()
    }
}

/// Error of a [`Storage`].
#[derive(Debug, Display, Error, From)]
pub enum StorageError {
    /// [`Storage`] cannot be accessed.
    #[display("token storage is unavailable: {_0}")]
    Unavailable(io::Error),
}

/// [`Storage`] keeping the token in a file.
#[derive(Clone, Debug)]
pub struct FileStorage {
    /// Path of the file.
    path: PathBuf,
}

impl FileStorage {
    /// Creates a new [`FileStorage`] keeping the token in the file at the
    /// provided `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(fs::write(&self.path, token)?)
    }

    fn remove(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

/// [`Storage`] keeping the token in memory for the current run only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Stored token.
    token: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Returns the stored token, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.token.lock().clone()
    }

    /// Stores the provided `token`, replacing the previous one.
    pub fn set(&self, token: &str) {
        *self.token.lock() = Some(token.to_owned());
    }

    /// Drops the stored token, if any.
    pub fn clear(&self) {
        *self.token.lock() = None;
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.get())
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        self.set(token);
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        self.clear();
        Ok(())
    }
}

/// [`Storage`] switching to a [`MemoryStorage`] for the rest of the run once
/// the primary [`Storage`] fails.
#[derive(Debug)]
pub(crate) struct Degrading {
    /// Primary [`Storage`].
    primary: Box<dyn Storage>,

    /// [`Storage`] used once the primary one has failed.
    fallback: MemoryStorage,

    /// Indicator whether the primary [`Storage`] has failed.
    degraded: AtomicBool,
}

impl Degrading {
    /// Wraps the provided `primary` [`Storage`].
    pub(crate) fn new(primary: Box<dyn Storage>) -> Self {
        Self {
            primary,
            fallback: MemoryStorage::default(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Indicates whether the primary [`Storage`] has failed.
    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Runs the provided operation over the primary [`Storage`], unless it
    /// has failed already.
    ///
    /// Returns [`None`] if the in-memory [`Storage`] should be used instead.
    fn try_primary<T>(
        &self,
        op: impl FnOnce(&dyn Storage) -> Result<T, StorageError>,
    ) -> Option<T> {
        if self.is_degraded() {
            return None;
        }
        op(self.primary.as_ref())
            .map_err(|e| {
                tracing::warn!("{e}, keeping session in memory only");
                self.degraded.store(true, Ordering::Release);
            })
            .ok()
    }

    /// Loads the persisted token, if any.
    pub(crate) fn load(&self) -> Option<String> {
        self.try_primary(|s| s.load())
            .unwrap_or_else(|| self.fallback.get())
    }

    /// Persists the provided `token`.
    pub(crate) fn store(&self, token: &str) {
        if self.try_primary(|s| s.store(token)).is_none() {
            self.fallback.set(token);
        }
    }

    /// Removes the persisted token, if any.
    pub(crate) fn remove(&self) {
        if self.try_primary(|s| s.remove()).is_none() {
            self.fallback.clear();
        }
    }
}
