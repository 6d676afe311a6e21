use crate::error::Result;
use crate::ingestion::{load_ledger, load_single_file, source_paths};
use crate::ledger::Ledger;
use crate::schema::LoaderConfig;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Every export in the directory
    Ledger,
    /// One named export
    File(String),
}

/// Name, size and modification time of every export in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySignature {
    entries: Vec<(String, u64, Option<SystemTime>)>,
}

impl DirectorySignature {
    pub fn capture(dir: &Path, config: &LoaderConfig) -> Result<Self> {
        let mut entries = Vec::new();
        for path in source_paths(dir, config)? {
            let metadata = fs::metadata(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push((name, metadata.len(), metadata.modified().ok()));
        }
        Ok(Self { entries })
    }

    /// Signature of one named file, whatever its extension. A missing file has no entries.
    pub fn capture_file(dir: &Path, filename: &str) -> Result<Self> {
        let path = dir.join(filename);
        if !path.is_file() {
            return Ok(Self {
                entries: Vec::new(),
            });
        }

        let metadata = fs::metadata(&path)?;
        Ok(Self {
            entries: vec![(
                filename.to_string(),
                metadata.len(),
                metadata.modified().ok(),
            )],
        })
    }

    /// The signature an entry for `key` is validated against.
    pub fn for_key(dir: &Path, config: &LoaderConfig, key: &CacheKey) -> Result<Self> {
        match key {
            CacheKey::Ledger => Self::capture(dir, config),
            CacheKey::File(name) => Self::capture_file(dir, name),
        }
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

struct CacheEntry {
    signature: DirectorySignature,
    ledger: Ledger,
}

/// Loaded ledgers for one source directory. The full ledger is reloaded whenever
/// the directory's signature changes, a single-file entry whenever that file's does.
pub struct LedgerCache {
    dir: PathBuf,
    config: LoaderConfig,
    entries: HashMap<CacheKey, CacheEntry>,
    stats: CacheStats,
}

impl LedgerCache {
    pub fn new(dir: impl Into<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn ledger(&mut self) -> Result<&Ledger> {
        self.get(CacheKey::Ledger)
    }

    pub fn single_file(&mut self, filename: &str) -> Result<&Ledger> {
        self.get(CacheKey::File(filename.to_string()))
    }

    pub fn get(&mut self, key: CacheKey) -> Result<&Ledger> {
        let signature = DirectorySignature::for_key(&self.dir, &self.config, &key)?;

        let entry = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().signature == signature {
                    debug!("Ledger cache hit for {:?}", occupied.key());
                    self.stats.hits += 1;
                } else {
                    debug!("Source files changed, reloading {:?}", occupied.key());
                    self.stats.misses += 1;
                    let ledger = load(&self.dir, &self.config, occupied.key())?;
                    occupied.insert(CacheEntry { signature, ledger });
                }
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                debug!("Ledger cache miss for {:?}", vacant.key());
                self.stats.misses += 1;
                let ledger = load(&self.dir, &self.config, vacant.key())?;
                vacant.insert(CacheEntry { signature, ledger })
            }
        };

        Ok(&entry.ledger)
    }

    /// Drops one entry. Returns true if it was cached.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load(dir: &Path, config: &LoaderConfig, key: &CacheKey) -> Result<Ledger> {
    match key {
        CacheKey::Ledger => load_ledger(dir, config),
        CacheKey::File(name) => load_single_file(dir, name, config),
    }
}
