use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::FileRow;
use crate::store::journal::{BlobRef, LogRecord};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub mime_type: String,
    pub size: u64,
    pub blob: BlobRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub files: u64,
    pub logical_bytes: u64,
    /// Frame bytes in the blob log no longer referenced by any live record.
    pub dead_bytes: u64,
    pub journal_bytes: u64,
    pub blob_bytes: u64,
}

/// Live view of the store, rebuilt by replaying the journal.
#[derive(Clone, Debug, Default)]
pub struct Index {
    pub by_name: BTreeMap<String, Entry>,
    pub dead_bytes: u64,
}

impl Index {
    pub fn apply(&mut self, rec: &LogRecord) {
        match rec {
            LogRecord::Put {
                name,
                mime_type,
                size,
                blob,
            } => {
                let e = Entry {
                    mime_type: mime_type.clone(),
                    size: *size,
                    blob: blob.clone(),
                };
                if let Some(old) = self.by_name.insert(name.clone(), e) {
                    self.dead_bytes += old.blob.len;
                }
            }
            LogRecord::Delete { name } => {
                if let Some(old) = self.by_name.remove(name) {
                    self.dead_bytes += old.blob.len;
                }
            }
        }
    }

    pub fn rows(&self) -> Vec<FileRow> {
        self.by_name
            .iter()
            .map(|(name, e)| FileRow {
                name: name.clone(),
                mime_type: e.mime_type.clone(),
                size: e.size,
                blake3: e.blob.blake3,
            })
            .collect()
    }

    pub fn logical_bytes(&self) -> u64 {
        self.by_name.values().map(|e| e.size).sum()
    }
}
