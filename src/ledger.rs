use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, SubwatchError};

/// Last known result of processing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

pub type LedgerEntries = BTreeMap<String, Outcome>;

/// Durable backing for the ledger
pub trait LedgerStore: Send + Sync {
    /// Load all entries. A store that does not exist yet is empty.
    fn load(&self) -> Result<LedgerEntries>;

    /// Replace the stored mapping with `entries`
    fn save(&self, entries: &LedgerEntries) -> Result<()>;
}

/// JSON object on disk, rewritten in full on every save
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<LedgerEntries> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(LedgerEntries::new());
            }
            Err(e) => {
                return Err(SubwatchError::Persistence(format!(
                    "Failed to read ledger {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            SubwatchError::Persistence(format!("Malformed ledger {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, entries: &LedgerEntries) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let write = || -> std::io::Result<()> {
            // Write beside the target and rename so a crash never leaves a torn file
            let mut file = NamedTempFile::new_in(dir)?;
            serde_json::to_writer_pretty(&mut file, entries)?;
            file.write_all(b"\n")?;
            file.as_file().sync_all()?;
            file.persist(&self.path).map_err(|e| e.error)?;
            Ok(())
        };

        write().map_err(|e| {
            SubwatchError::Persistence(format!("Failed to write ledger {}: {}", self.path.display(), e))
        })
    }
}

/// Process-local store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<LedgerEntries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerEntries>> {
        self.entries
            .lock()
            .map_err(|_| SubwatchError::Persistence("Memory store lock poisoned".to_string()))
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<LedgerEntries> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, entries: &LedgerEntries) -> Result<()> {
        *self.lock()? = entries.clone();
        Ok(())
    }
}

/// Which files have been processed and how it went
pub struct Ledger {
    entries: LedgerEntries,
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    /// Load the ledger from `store`. A malformed store is an error.
    pub fn open(store: Box<dyn LedgerStore>) -> Result<Self> {
        let entries = store.load()?;
        debug!("Loaded ledger with {} entries", entries.len());
        Ok(Self { entries, store })
    }

    pub fn in_memory() -> Self {
        Self {
            entries: LedgerEntries::new(),
            store: Box::new(MemoryStore::new()),
        }
    }

    pub fn has<P: AsRef<Path>>(&self, path: P) -> bool {
        self.entries.contains_key(&key(path.as_ref()))
    }

    pub fn outcome<P: AsRef<Path>>(&self, path: P) -> Option<Outcome> {
        self.entries.get(&key(path.as_ref())).copied()
    }

    /// Record `outcome` for `path` and persist before returning.
    ///
    /// If the store rejects the write, the in-memory entry is rolled back so it
    /// never claims more than what is durable.
    pub fn record<P: AsRef<Path>>(&mut self, path: P, outcome: Outcome) -> Result<()> {
        let key = key(path.as_ref());
        let previous = self.entries.insert(key.clone(), outcome);

        if let Err(e) = self.store.save(&self.entries) {
            match previous {
                Some(previous) => self.entries.insert(key, previous),
                None => self.entries.remove(&key),
            };
            return Err(e);
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
