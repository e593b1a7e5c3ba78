//! Durable node store: one TOML document per hierarchy instance.
//!
//! Every commit rewrites the document through a temp file in the same
//! directory followed by an atomic rename, so readers of the file never see a
//! partially applied operation.
//!
//! Writers in separate processes serialize on an exclusive lock over a
//! sidecar `<file>.lock`. The document is re-read under that lock before any
//! change is applied, so a commit never overwrites work it has not seen.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::domain::{Filter, Node, NodeId, Payload, Update};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::traits::NodeStore;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Payload"))]
struct Document<P> {
    format: u32,
    #[serde(default = "Vec::new")]
    nodes: Vec<Node<P>>,
}

/// Exclusive inter-process lock, released on drop.
#[derive(Debug)]
struct StoreLock {
    file: File,
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("unlock {} failed: {e}", self.path.display());
        }
    }
}

/// Node store persisted to a TOML file.
#[derive(Debug)]
pub struct FileStore<P> {
    path: PathBuf,
    cache: MemoryStore<P>,
    lock: Option<StoreLock>,
}

impl<P: Payload> FileStore<P> {
    /// Open the store at `path`; a missing file is an empty store.
    #[instrument(level = "debug")]
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = load(&path)?;
        Ok(Self {
            path,
            cache,
            lock: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file the writers lock on, e.g. `folders.toml.lock`.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    /// Block until this process holds the write lock, then refresh the cache
    /// from whatever the last writer committed.
    fn acquire(&mut self) -> StoreResult<()> {
        if self.lock.is_some() {
            return Ok(());
        }
        let dir = self.dir();
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;

        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| StoreError::io(format!("open {}", lock_path.display()), e))?;
        file.lock_exclusive()
            .map_err(|e| StoreError::io(format!("lock {}", lock_path.display()), e))?;
        let lock = StoreLock {
            file,
            path: lock_path,
        };

        self.cache = load(&self.path)?;
        self.lock = Some(lock);
        Ok(())
    }

    fn release(&mut self) {
        self.lock = None;
    }

    fn persist(&self) -> StoreResult<()> {
        let nodes = self.cache.find_where(&Filter::All)?;
        let doc = Document {
            format: FORMAT_VERSION,
            nodes,
        };
        let content = toml::to_string(&doc).map_err(|e| StoreError::Encode(e.to_string()))?;

        let dir = self.dir();
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::io(format!("temp file in {}", dir.display()), e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io("write temp file", e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(format!("replace {}", self.path.display()), e.error))?;
        debug!("persisted {} ({} bytes)", self.path.display(), content.len());
        Ok(())
    }

    /// Run a single write outside an explicit transaction as its own
    /// transaction so the file and the cache never diverge.
    fn write<T>(&mut self, op: impl FnOnce(&mut MemoryStore<P>) -> StoreResult<T>) -> StoreResult<T> {
        if self.cache.in_transaction() {
            return op(&mut self.cache);
        }
        self.acquire()?;
        let result = self.cache.begin().and_then(|_| {
            let result = op(&mut self.cache).and_then(|value| self.persist().map(|_| value));
            match result {
                Ok(value) => self.cache.commit().map(|_| value),
                Err(e) => self.cache.rollback().and(Err(e)),
            }
        });
        self.release();
        result
    }
}

fn load<P: Payload>(path: &Path) -> StoreResult<MemoryStore<P>> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| StoreError::io(format!("read {}", path.display()), e))?;
    let doc: Document<P> = toml::from_str(&content).map_err(|e| StoreError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if doc.format != FORMAT_VERSION {
        return Err(StoreError::Decode {
            path: path.to_path_buf(),
            message: format!("unsupported format version {}", doc.format),
        });
    }
    debug!("loaded {} nodes from {}", doc.nodes.len(), path.display());
    Ok(MemoryStore::from_nodes(doc.nodes))
}

impl<P: Payload> NodeStore<P> for FileStore<P> {
    fn find_by_id(&self, id: NodeId) -> StoreResult<Option<Node<P>>> {
        self.cache.find_by_id(id)
    }

    fn find_where(&self, filter: &Filter) -> StoreResult<Vec<Node<P>>> {
        self.cache.find_where(filter)
    }

    fn count_where(&self, filter: &Filter) -> StoreResult<usize> {
        self.cache.count_where(filter)
    }

    fn insert_one(&mut self, node: Node<P>) -> StoreResult<Node<P>> {
        self.write(|cache| cache.insert_one(node))
    }

    fn update_many(&mut self, filter: &Filter, update: &Update) -> StoreResult<usize> {
        self.write(|cache| cache.update_many(filter, update))
    }

    fn update_payload(&mut self, id: NodeId, payload: P) -> StoreResult<bool> {
        self.write(|cache| cache.update_payload(id, payload))
    }

    fn delete_many(&mut self, filter: &Filter) -> StoreResult<usize> {
        self.write(|cache| cache.delete_many(filter))
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.cache.in_transaction() {
            return self.cache.begin();
        }
        self.acquire()?;
        let result = self.cache.begin();
        if result.is_err() {
            self.release();
        }
        result
    }

    fn commit(&mut self) -> StoreResult<()> {
        let result = match self.persist() {
            Ok(()) => self.cache.commit(),
            Err(e) => self.cache.rollback().and(Err(e)),
        };
        self.release();
        result
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let result = self.cache.rollback();
        self.release();
        result
    }

    fn in_transaction(&self) -> bool {
        self.cache.in_transaction()
    }
}
