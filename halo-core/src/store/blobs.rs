use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{HaloError, Result};
use crate::store::journal::is_unfinished_header;
use crate::store::varint::put_uvarint;

const MAGIC: &[u8; 8] = b"HALOBLB\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = 9;

/// Append-only log of blob frames. Frames are only reachable through journal records;
/// bytes appended without a matching commit are dead weight until compaction.
pub struct BlobLog {
    f: File,
    pub path: PathBuf,
    pub next_off: u64,
}

impl BlobLog {
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if f.metadata()?.len() < HEADER_LEN && is_unfinished_header(&mut f, MAGIC)? {
            f.set_len(0)?;
            write_header(&mut f)?;
        } else {
            f.seek(SeekFrom::Start(0))?;
            let mut magic = [0u8; 8];
            f.read_exact(&mut magic)
                .map_err(|_| HaloError::Format("blob log header truncated".into()))?;
            if &magic != MAGIC {
                return Err(HaloError::Format("not a halo blob log (bad magic)".into()));
            }
        }
        let next_off = f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            next_off,
        })
    }

    /// Create an empty blob log at `path`, discarding anything already there.
    pub fn create(path: &Path) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        write_header(&mut f)?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            next_off: HEADER_LEN,
        })
    }

    /// Returns `(payload_off, payload_len)` of the stored frame.
    pub fn append_frame(&mut self, frame: &[u8]) -> Result<(u64, u64)> {
        let off_before = self.f.seek(SeekFrom::End(0))?;
        let mut lenv = Vec::with_capacity(10);
        put_uvarint(&mut lenv, frame.len() as u64);
        self.f.write_all(&lenv)?;
        self.f.write_all(frame)?;
        self.f.flush()?;
        self.f.sync_data()?;
        let payload_off = off_before + lenv.len() as u64;
        self.next_off = payload_off + frame.len() as u64;
        Ok((payload_off, frame.len() as u64))
    }

    pub fn read_frame(&mut self, off: u64, len: u64) -> Result<Vec<u8>> {
        if off < HEADER_LEN || off.saturating_add(len) > self.next_off {
            return Err(HaloError::Format(format!(
                "blob frame {off}+{len} is outside the blob log"
            )));
        }
        self.f.seek(SeekFrom::Start(off))?;
        let mut buf = vec![0u8; len as usize];
        self.f.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Pick up frames appended through other handles since the last look.
    pub fn refresh(&mut self) -> Result<()> {
        self.next_off = self.f.metadata()?.len();
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.next_off
    }
}

fn write_header(f: &mut File) -> Result<()> {
    f.seek(SeekFrom::Start(0))?;
    f.write_all(MAGIC)?;
    f.write_all(&[VERSION])?;
    f.flush()?;
    Ok(())
}
