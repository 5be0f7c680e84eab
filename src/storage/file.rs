//! Filesystem storage backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/.lock                                 held exclusively while open
//! <root>/proposals/00000000000000000001.cbor   one CBOR record per proposal id
//! <root>/next_id.cbor                          allocator value
//! ```
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so a crash mid-write leaves either the old record or the new one.
//!
//! The store keeps its index in memory, so only one process may have a
//! root open at a time. [`FileBackend::open`] takes an exclusive advisory
//! lock on `<root>/.lock` and fails with [`StorageError::Locked`] while
//! another handle holds it. The lock is released when the last clone of the
//! backend is dropped.

use super::traits::*;
use crate::governance::types::{Proposal, ProposalId};
use crate::serialization::{from_cbor, to_cbor};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::fs::TryLockError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::warn;

const LOCK_FILE: &str = ".lock";
const RECORD_DIR: &str = "proposals";
const RECORD_EXT: &str = "cbor";
const NEXT_ID_FILE: &str = "next_id.cbor";
const TMP_SUFFIX: &str = ".tmp";

/// One-file-per-record backend rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    _lock: Arc<std::fs::File>,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root` and lock it.
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(RECORD_DIR)).await?;

        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(root.join(LOCK_FILE))
            .await?
            .into_std()
            .await;
        match lock.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(StorageError::Locked(root)),
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        tracing::debug!(root = %root.display(), "file backend opened");
        Ok(Self {
            root,
            _lock: Arc::new(lock),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: ProposalId) -> PathBuf {
        // Zero-padded so a directory listing sorts by id.
        self.root
            .join(RECORD_DIR)
            .join(format!("{:020}.{}", id.0, RECORD_EXT))
    }

    fn parse_record_name(path: &Path) -> Option<ProposalId> {
        if path.extension()?.to_str()? != RECORD_EXT {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok().map(ProposalId)
    }

    async fn read_record(path: &Path, expected: ProposalId) -> StorageResult<Proposal> {
        let bytes = fs::read(path).await?;
        let record: Proposal = from_cbor(&bytes)?;
        if record.id != expected {
            return Err(StorageError::Corrupted(format!(
                "record {} filed under id {}",
                record.id, expected
            )));
        }
        Ok(record)
    }

    /// Write `record` to the temp sibling of its final path.
    async fn stage(&self, record: &Proposal) -> StorageResult<(PathBuf, PathBuf)> {
        let path = self.record_path(record.id);
        let tmp = tmp_path(&path);
        fs::write(&tmp, to_cbor(record)?).await?;
        Ok((tmp, path))
    }

    /// Rename staged files into place in order. On failure, every file
    /// already moved is put back the way it was.
    async fn commit(staged: &[(PathBuf, PathBuf)]) -> StorageResult<()> {
        let mut committed: Vec<(&Path, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());

        for (tmp, path) in staged {
            let step = async {
                let previous = match fs::read(path).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) if e.kind() == ErrorKind::NotFound => None,
                    Err(e) => return Err(e),
                };
                fs::rename(tmp, path).await?;
                Ok(previous)
            };
            match step.await {
                Ok(previous) => committed.push((path.as_path(), previous)),
                Err(e) => {
                    Self::roll_back(&committed).await;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    async fn roll_back(committed: &[(&Path, Option<Vec<u8>>)]) {
        for (path, previous) in committed.iter().rev() {
            let restored = match previous {
                Some(bytes) => write_atomic(path, bytes).await,
                None => fs::remove_file(path).await.map_err(StorageError::from),
            };
            if let Err(e) = restored {
                warn!(path = %path.display(), error = %e, "import rollback failed");
            }
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    PathBuf::from(tmp)
}

async fn discard(paths: impl Iterator<Item = PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove staged file");
            }
        }
    }
}

/// Write `bytes` to `path` via a temporary file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn put(&self, record: &Proposal) -> StorageResult<()> {
        let bytes = to_cbor(record)?;
        write_atomic(&self.record_path(record.id), &bytes).await
    }

    async fn export_all(&self) -> StorageResult<Vec<(ProposalId, Proposal)>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(self.root.join(RECORD_DIR)).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let Some(id) = Self::parse_record_name(&path) else {
                // Leftover temp files and strangers are ignored.
                continue;
            };
            let record = Self::read_record(&path, id).await?;
            entries.push((id, record));
        }

        entries.sort_by_key(|(id, _)| *id);
        Ok(entries)
    }

    async fn import_all(&self, entries: &[(ProposalId, Proposal)]) -> StorageResult<()> {
        for (id, record) in entries {
            if *id != record.id {
                return Err(StorageError::Corrupted(format!(
                    "import entry {} carries record {}",
                    id, record.id
                )));
            }
        }

        // Stage everything before touching a live record.
        let staged = match try_join_all(entries.iter().map(|(_, record)| self.stage(record))).await
        {
            Ok(staged) => staged,
            Err(e) => {
                discard(entries.iter().map(|(id, _)| tmp_path(&self.record_path(*id)))).await;
                return Err(e);
            }
        };

        let result = Self::commit(&staged).await;
        if result.is_err() {
            discard(staged.into_iter().map(|(tmp, _)| tmp)).await;
        }
        result
    }

    async fn load_next_id(&self) -> StorageResult<Option<ProposalId>> {
        match fs::read(self.root.join(NEXT_ID_FILE)).await {
            Ok(bytes) => Ok(Some(from_cbor(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_next_id(&self, next: ProposalId) -> StorageResult<()> {
        let bytes = to_cbor(&next)?;
        write_atomic(&self.root.join(NEXT_ID_FILE), &bytes).await
    }
}
