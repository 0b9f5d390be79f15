use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::util::varint::{put_uvarint, uvarint_len};

/// Payload area: `uvarint(len) || bytes` frames appended back to back.
/// Callers address a frame by the offset of its first payload byte.
pub struct FrameFile {
    f: File,
    pub path: PathBuf,
    pub next_off: u64,
    sync: bool,
}

impl FrameFile {
    pub fn open(path: &Path, sync: bool) -> Result<Self, StoreError> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let next_off = f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            next_off,
            sync,
        })
    }

    /// Start an empty frame file, discarding anything already at `path`.
    pub fn create(path: &Path, sync: bool) -> Result<Self, StoreError> {
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            next_off: 0,
            sync,
        })
    }

    pub fn append_frame(&mut self, bytes: &[u8]) -> Result<(u64, u64), StoreError> {
        let mut lenv = Vec::with_capacity(uvarint_len(bytes.len() as u64));
        put_uvarint(&mut lenv, bytes.len() as u64);
        let off_before = self.next_off;
        // Readers share this handle's cursor, so always position explicitly.
        let res = self
            .f
            .seek(SeekFrom::Start(off_before))
            .and_then(|_| self.f.write_all(&lenv))
            .and_then(|_| self.f.write_all(bytes))
            .and_then(|_| self.f.flush());
        res.map_err(StoreError::WriteFailed)?;
        let payload_off = off_before + lenv.len() as u64;
        self.next_off = payload_off + bytes.len() as u64;
        Ok((payload_off, bytes.len() as u64))
    }

    pub fn read_frame(&self, off: u64, len: u64) -> Result<Vec<u8>, StoreError> {
        if off.saturating_add(len) > self.next_off {
            return Err(StoreError::Corrupt(format!(
                "frame {off}+{len} beyond end of {}",
                self.path.display()
            )));
        }
        let mut f = self.f.try_clone()?;
        f.seek(SeekFrom::Start(off))?;
        let mut buf = vec![0u8; len as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn sync(&self) -> Result<(), StoreError> {
        if self.sync {
            self.f.sync_data()?;
        }
        Ok(())
    }

    pub fn force_sync(&self) -> Result<(), StoreError> {
        self.f.sync_all()?;
        Ok(())
    }
}
