use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

use crate::codec::{decode_frame, encode_frame};
use crate::domain::{FileRow, StoredFile};
use crate::error::{HaloError, Result};
use crate::store::blobs::BlobLog;
use crate::store::index::{Entry, Index, Stats};
use crate::store::journal::{BlobRef, Journal, LogRecord};

pub const JOURNAL_FILE: &str = "files.journal";
const LOCK_FILE: &str = ".halo-lock";
const BLOB_PREFIX: &str = "blobs.";
const COMPACT_PREFIX: &str = ".halo-compact";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    pub compression_level: i32,
    /// Only keep a zstd frame if it saves at least this fraction over STORE.
    pub min_gain: f32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            compression_level: 3,
            min_gain: 0.05,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub files: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

/// Record store keyed by file name: a journal of put/delete records over a blob log.
///
/// The journal append is the commit point of every write. Each operation holds
/// an exclusive lock on the store directory and first catches up with records
/// committed through other handles, so any number of handles (and processes)
/// may share one directory. Blob frames written by a transaction that never
/// committed are unreachable and get dropped by [`RecordStore::compact`].
pub struct RecordStore {
    dir: PathBuf,
    opts: StoreOptions,
    lock: RwLock<File>,
    state: State,
}

/// This handle's view of the directory.
struct State {
    journal: Journal,
    blobs: BlobLog,
    index: Index,
}

impl RecordStore {
    /// Fails with `StorageUnavailable` when the directory or either log cannot be opened.
    pub fn open(dir: &Path, opts: StoreOptions) -> Result<Self> {
        Self::open_inner(dir, opts).map_err(into_unavailable)
    }

    fn open_inner(dir: &Path, opts: StoreOptions) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        let mut lock = RwLock::new(lock_file);
        let state = {
            let _guard = lock.write()?;
            State::load(dir)?
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            opts,
            lock,
            state,
        })
    }

    /// Run `op` as one transaction: directory lock held, state current.
    fn locked<T>(&mut self, op: impl FnOnce(&mut State, &Path) -> Result<T>) -> Result<T> {
        let _guard = self.lock.write()?;
        self.state.refresh(&self.dir)?;
        op(&mut self.state, &self.dir)
    }

    /// Persist `file`, replacing whatever was stored under the same name.
    pub fn put(&mut self, file: &StoredFile) -> Result<()> {
        let opts = self.opts;
        self.locked(|st, _| st.put(file, opts))
            .map_err(into_op_failed)
    }

    /// Remove `name`. Returns whether anything was removed; absent names are a no-op.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        self.locked(|st, _| st.delete(name)).map_err(into_op_failed)
    }

    pub fn get(&mut self, name: &str) -> Result<Option<StoredFile>> {
        self.locked(|st, _| {
            let Some(entry) = st.index.by_name.get(name).cloned() else {
                return Ok(None);
            };
            st.load_entry(name, &entry).map(Some)
        })
        .map_err(into_op_failed)
    }

    /// Every live record with its bytes, in name order.
    pub fn all(&mut self) -> Result<Vec<StoredFile>> {
        self.locked(|st, _| {
            let entries: Vec<(String, Entry)> = st
                .index
                .by_name
                .iter()
                .map(|(n, e)| (n.clone(), e.clone()))
                .collect();
            entries
                .iter()
                .map(|(name, e)| st.load_entry(name, e))
                .collect::<Result<Vec<_>>>()
        })
        .map_err(into_op_failed)
    }

    pub fn rows(&mut self) -> Result<Vec<FileRow>> {
        self.locked(|st, _| Ok(st.index.rows()))
            .map_err(into_op_failed)
    }

    pub fn stats(&mut self) -> Result<Stats> {
        self.locked(|st, _| {
            Ok(Stats {
                files: st.index.by_name.len() as u64,
                logical_bytes: st.index.logical_bytes(),
                dead_bytes: st.index.dead_bytes,
                journal_bytes: st.journal.len(),
                blob_bytes: st.blobs.len(),
            })
        })
        .map_err(into_op_failed)
    }

    /// Rewrite the live records into a fresh blob log and journal.
    ///
    /// The new journal replaces the old one with a single rename; until then the
    /// old pair stays authoritative, so an interrupted compaction loses nothing.
    pub fn compact(&mut self) -> Result<CompactReport> {
        self.locked(|st, dir| st.compact(dir))
            .map_err(into_op_failed)
    }
}

impl State {
    fn load(dir: &Path) -> Result<Self> {
        let mut journal = Journal::open(&dir.join(JOURNAL_FILE), 0)?;
        let blobs_path = blob_path(dir, journal.epoch);
        if !journal.is_empty() && !blobs_path.exists() {
            return Err(HaloError::StorageUnavailable(format!(
                "blob log {} is missing",
                blobs_path.display()
            )));
        }
        let blobs = BlobLog::open(&blobs_path)?;

        let mut index = Index::default();
        let records = journal.replay()?;
        for rec in &records {
            index.apply(rec);
        }
        sweep_stale(dir, journal.epoch);

        tracing::info!(
            dir = %dir.display(),
            epoch = journal.epoch,
            records = records.len(),
            files = index.by_name.len(),
            "record store opened"
        );
        Ok(Self {
            journal,
            blobs,
            index,
        })
    }

    /// Bring this view up to date with what other handles committed.
    fn refresh(&mut self, dir: &Path) -> Result<()> {
        let path = dir.join(JOURNAL_FILE);
        let on_disk = std::fs::metadata(&path)?.len();
        if Journal::epoch_on_disk(&path)? != self.journal.epoch || on_disk < self.journal.len() {
            tracing::debug!(dir = %dir.display(), "store rewritten elsewhere, reloading");
            *self = State::load(dir)?;
            return Ok(());
        }
        if on_disk > self.journal.len() {
            let records = self.journal.catch_up()?;
            for rec in &records {
                self.index.apply(rec);
            }
            tracing::debug!(records = records.len(), "caught up with journal");
        }
        self.blobs.refresh()
    }

    fn put(&mut self, file: &StoredFile, opts: StoreOptions) -> Result<()> {
        let hash = *blake3::hash(&file.data).as_bytes();
        let (codec, frame) = encode_frame(&file.data, opts.compression_level, opts.min_gain)?;
        let (off, len) = self.blobs.append_frame(&frame)?;
        let rec = LogRecord::Put {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
            blob: BlobRef {
                off,
                len,
                codec,
                blake3: hash,
            },
        };
        self.journal.append(&rec)?;
        self.index.apply(&rec);
        tracing::debug!(
            name = %file.name,
            size = file.size(),
            stored = len,
            codec = ?codec,
            "put committed"
        );
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        if !self.index.by_name.contains_key(name) {
            tracing::debug!(name, "delete of absent name ignored");
            return Ok(false);
        }
        let rec = LogRecord::Delete {
            name: name.to_string(),
        };
        self.journal.append(&rec)?;
        self.index.apply(&rec);
        tracing::debug!(name, "delete committed");
        Ok(true)
    }

    fn load_entry(&mut self, name: &str, e: &Entry) -> Result<StoredFile> {
        let frame = self.blobs.read_frame(e.blob.off, e.blob.len)?;
        let data = decode_frame(e.blob.codec, &frame, e.size)?;
        if data.len() as u64 != e.size || *blake3::hash(&data).as_bytes() != e.blob.blake3 {
            return Err(HaloError::StorageOperationFailed(format!(
                "checksum mismatch for {name}"
            )));
        }
        Ok(StoredFile {
            name: name.to_string(),
            mime_type: e.mime_type.clone(),
            data,
        })
    }

    fn compact(&mut self, dir: &Path) -> Result<CompactReport> {
        let bytes_before = self.journal.len() + self.blobs.len();
        let next_epoch = self.journal.epoch + 1;

        let mut new_blobs = BlobLog::create(&blob_path(dir, next_epoch))?;
        let tmp = tempfile::Builder::new()
            .prefix(COMPACT_PREFIX)
            .tempfile_in(dir)?;
        let mut new_journal = Journal::create(tmp.path(), next_epoch)?;

        for (name, e) in &self.index.by_name {
            // frames move as-is; no recompression
            let frame = self.blobs.read_frame(e.blob.off, e.blob.len)?;
            let (off, len) = new_blobs.append_frame(&frame)?;
            new_journal.append(&LogRecord::Put {
                name: name.clone(),
                mime_type: e.mime_type.clone(),
                size: e.size,
                blob: BlobRef {
                    off,
                    len,
                    ..e.blob.clone()
                },
            })?;
        }
        let bytes_after = new_journal.len() + new_blobs.len();
        drop(new_journal);
        drop(new_blobs);

        tmp.persist(dir.join(JOURNAL_FILE))
            .map_err(|e| HaloError::Io(e.error))?;
        *self = State::load(dir)?;

        let report = CompactReport {
            files: self.index.by_name.len() as u64,
            bytes_before,
            bytes_after,
        };
        tracing::info!(
            dir = %dir.display(),
            epoch = next_epoch,
            files = report.files,
            bytes_before,
            bytes_after,
            "record store compacted"
        );
        Ok(report)
    }
}

fn blob_path(dir: &Path, epoch: u64) -> PathBuf {
    dir.join(format!("{BLOB_PREFIX}{epoch}"))
}

/// Remove blob logs from other epochs and leftovers of interrupted compactions.
fn sweep_stale(dir: &Path, epoch: u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        let stale = match name.strip_prefix(BLOB_PREFIX) {
            Some(n) => n.parse::<u64>().is_ok_and(|n| n != epoch),
            None => name.starts_with(COMPACT_PREFIX),
        };
        if stale {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                tracing::warn!(file = %name, error = %e, "failed to remove stale store file");
            }
        }
    }
}

fn into_unavailable(e: HaloError) -> HaloError {
    match e {
        HaloError::StorageUnavailable(_) => e,
        other => HaloError::unavailable(other),
    }
}

fn into_op_failed(e: HaloError) -> HaloError {
    match e {
        HaloError::StorageOperationFailed(_) => e,
        other => HaloError::op_failed(other),
    }
}
