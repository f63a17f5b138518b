use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::CodecId;
use crate::error::{HaloError, Result};
use crate::store::varint::{get_uvarint, put_uvarint};

const MAGIC: &[u8; 8] = b"HALOLOG\0";
const VERSION: u8 = 1;
/// magic + version + blob epoch
pub const HEADER_LEN: u64 = 8 + 1 + 8;

/// Location of one blob frame inside the blob log.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    pub off: u64,
    pub len: u64,
    pub codec: CodecId,
    /// Hash of the uncompressed bytes.
    pub blake3: [u8; 32],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LogRecord {
    Put {
        name: String,
        mime_type: String,
        size: u64,
        blob: BlobRef,
    },
    Delete {
        name: String,
    },
}

/// Append-only record log. Each appended record is one committed transaction.
pub struct Journal {
    f: File,
    pub path: PathBuf,
    /// Names the blob log this journal points into; bumped by compaction.
    pub epoch: u64,
    len: u64,
}

impl Journal {
    /// Open (or initialise) the journal at `path`. A fresh file gets `epoch`.
    pub fn open(path: &Path, epoch: u64) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = f.metadata()?.len();
        let epoch = if file_len < HEADER_LEN && is_unfinished_header(&mut f, MAGIC)? {
            // nothing can have committed before the header was complete
            f.set_len(0)?;
            write_header(&mut f, epoch)?;
            epoch
        } else {
            read_header(&mut f)?
        };
        let len = f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            epoch,
            len,
        })
    }

    /// Create a journal at `path`, discarding anything already there.
    pub fn create(path: &Path, epoch: u64) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        write_header(&mut f, epoch)?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            epoch,
            len: HEADER_LEN,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len <= HEADER_LEN
    }

    /// Read every committed record. A torn tail left by an interrupted append is cut off.
    pub fn replay(&mut self) -> Result<Vec<LogRecord>> {
        self.read_from(HEADER_LEN)
    }

    /// Records appended since this handle last read or wrote, e.g. by another process.
    pub fn catch_up(&mut self) -> Result<Vec<LogRecord>> {
        self.read_from(self.len)
    }

    fn read_from(&mut self, start: u64) -> Result<Vec<LogRecord>> {
        self.f.seek(SeekFrom::Start(start))?;
        let mut out = Vec::new();
        let mut good_end = start;
        while let Some(rec) = read_next_record(&mut self.f)? {
            out.push(rec);
            good_end = self.f.stream_position()?;
        }
        let file_len = self.f.metadata()?.len();
        if file_len > good_end {
            tracing::warn!(
                journal = %self.path.display(),
                dropped_bytes = file_len - good_end,
                "discarding torn journal tail"
            );
            self.f.set_len(good_end)?;
        }
        self.len = self.f.seek(SeekFrom::End(0))?;
        Ok(out)
    }

    /// Epoch recorded in the header of the journal currently at `path`.
    pub fn epoch_on_disk(path: &Path) -> Result<u64> {
        read_header(&mut File::open(path)?)
    }

    /// Append a single record (length-delimited) and flush it to disk.
    ///
    /// On failure the file is cut back to its previous length so a half-written
    /// record never precedes later appends.
    pub fn append(&mut self, rec: &LogRecord) -> Result<()> {
        let mut plain = Vec::with_capacity(256);
        ciborium::ser::into_writer(rec, &mut plain)
            .map_err(|e| HaloError::Format(format!("journal encode: {e}")))?;

        let mut buf = Vec::with_capacity(plain.len() + 10);
        put_uvarint(&mut buf, plain.len() as u64);
        buf.extend_from_slice(&plain);

        let res = self.write_at_end(&buf);
        if res.is_err() {
            let _ = self.f.set_len(self.len);
        }
        res?;
        self.len += buf.len() as u64;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn reopen_read_only(&mut self) -> Result<()> {
        self.f = File::open(&self.path)?;
        Ok(())
    }

    fn write_at_end(&mut self, buf: &[u8]) -> Result<()> {
        self.f.seek(SeekFrom::Start(self.len))?;
        self.f.write_all(buf)?;
        self.f.flush()?;
        self.f.sync_data()?;
        Ok(())
    }
}

fn write_header(f: &mut File, epoch: u64) -> Result<()> {
    f.seek(SeekFrom::Start(0))?;
    f.write_all(MAGIC)?;
    f.write_all(&[VERSION])?;
    f.write_all(&epoch.to_le_bytes())?;
    f.flush()?;
    f.sync_data()?;
    Ok(())
}

fn read_header(f: &mut File) -> Result<u64> {
    f.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)
        .map_err(|_| HaloError::Format("journal header truncated".into()))?;
    if &magic != MAGIC {
        return Err(HaloError::Format("not a halo journal (bad magic)".into()));
    }
    let mut ver = [0u8; 1];
    f.read_exact(&mut ver)?;
    if ver[0] > VERSION {
        return Err(HaloError::Format(format!(
            "journal version {} is newer than supported {VERSION}",
            ver[0]
        )));
    }
    let mut epoch = [0u8; 8];
    f.read_exact(&mut epoch)?;
    Ok(u64::from_le_bytes(epoch))
}

/// True when the file holds a prefix of a header for `magic` and nothing else.
pub(crate) fn is_unfinished_header(f: &mut File, magic: &[u8; 8]) -> Result<bool> {
    let mut head = Vec::new();
    f.seek(SeekFrom::Start(0))?;
    f.read_to_end(&mut head)?;
    let n = head.len().min(magic.len());
    Ok(head[..n] == magic[..n])
}

fn read_next_record(f: &mut File) -> Result<Option<LogRecord>> {
    let len = match get_uvarint(f)? {
        Some(n) => n,
        None => return Ok(None),
    };

    let remaining = f.metadata()?.len().saturating_sub(f.stream_position()?);
    if len > remaining {
        return Ok(None);
    }
    let mut buf = vec![0u8; len as usize];
    if let Err(e) = f.read_exact(&mut buf) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e.into());
    }

    let rec: LogRecord = ciborium::de::from_reader(&buf[..])
        .map_err(|e| HaloError::Format(format!("journal record decode: {e}")))?;
    Ok(Some(rec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn put(name: &str) -> LogRecord {
        LogRecord::Put {
            name: name.to_string(),
            mime_type: "text/plain".into(),
            size: 2,
            blob: BlobRef {
                off: 9,
                len: 2,
                codec: CodecId::Store,
                blake3: [7; 32],
            },
        }
    }

    #[test]
    fn records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        {
            let mut j = Journal::open(&path, 0).unwrap();
            j.append(&put("a.txt")).unwrap();
            j.append(&LogRecord::Delete { name: "a.txt".into() }).unwrap();
        }
        let mut j = Journal::open(&path, 99).unwrap();
        assert_eq!(j.epoch, 0, "existing header wins over the requested epoch");
        let recs = j.replay().unwrap();
        assert_eq!(recs, vec![put("a.txt"), LogRecord::Delete { name: "a.txt".into() }]);
    }

    #[test]
    fn torn_tail_is_discarded_and_appends_continue() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        let good_len = {
            let mut j = Journal::open(&path, 0).unwrap();
            j.append(&put("a.txt")).unwrap();
            j.len()
        };
        {
            // claims 50 bytes of payload, provides 3
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[50, 1, 2, 3]).unwrap();
        }

        let mut j = Journal::open(&path, 0).unwrap();
        assert_eq!(j.replay().unwrap(), vec![put("a.txt")]);
        assert_eq!(j.len(), good_len);

        j.append(&put("b.txt")).unwrap();
        let mut j = Journal::open(&path, 0).unwrap();
        assert_eq!(j.replay().unwrap(), vec![put("a.txt"), put("b.txt")]);
    }

    #[test]
    fn half_written_header_is_started_over() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        std::fs::write(&path, b"HALOL").unwrap();

        let mut j = Journal::open(&path, 0).unwrap();
        assert!(j.replay().unwrap().is_empty());
        j.append(&put("a.txt")).unwrap();

        let mut j = Journal::open(&path, 0).unwrap();
        assert_eq!(j.replay().unwrap(), vec![put("a.txt")]);
    }

    #[test]
    fn catch_up_sees_records_of_another_handle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        let mut a = Journal::open(&path, 0).unwrap();
        let mut b = Journal::open(&path, 0).unwrap();
        a.append(&put("from-a")).unwrap();

        assert_eq!(b.catch_up().unwrap(), vec![put("from-a")]);
        assert_eq!(b.len(), a.len());
        b.append(&put("from-b")).unwrap();
        assert_eq!(a.catch_up().unwrap(), vec![put("from-b")]);
        assert!(a.catch_up().unwrap().is_empty());
    }

    #[test]
    fn failed_append_leaves_committed_records_alone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        let len = {
            let mut j = Journal::open(&path, 0).unwrap();
            j.append(&put("a.txt")).unwrap();
            j.len()
        };

        let mut read_only = Journal {
            f: File::open(&path).unwrap(),
            path: path.clone(),
            epoch: 0,
            len,
        };
        assert!(read_only.append(&put("b.txt")).is_err());
        assert_eq!(read_only.len(), len);

        let mut j = Journal::open(&path, 0).unwrap();
        assert_eq!(j.replay().unwrap(), vec![put("a.txt")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.journal");
        std::fs::write(&path, b"definitely not a journal").unwrap();
        let err = Journal::open(&path, 0).err().unwrap();
        assert!(matches!(err, HaloError::Format(_)));
        std::fs::write(&path, b"nope").unwrap();
        assert!(Journal::open(&path, 0).is_err(), "short foreign content is not a header");
        std::fs::write(&path, b"definitely not a journal").unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"definitely not a journal",
            "foreign content is left untouched"
        );
    }
}
