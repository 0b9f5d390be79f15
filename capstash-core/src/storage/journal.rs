use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::storage::tables::Op;
use crate::util::varint::{get_uvarint, put_uvarint, uvarint_len};

const MAGIC: &[u8; 8] = b"CAPLOG\0\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = (MAGIC.len() + 1) as u64;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum LogRecord {
    /// One committed transaction.
    Batch(Vec<Op>),
    /// Names the frame file generation the following batches point into,
    /// and the lowest sequence number new fragments may take.
    Frames {
        generation: u64,
        #[serde(default)]
        next_seq: u64,
    },
}

/// Append-only, varint length-delimited CBOR log. A record is either fully
/// present or it is a torn tail that replay cuts off.
pub struct Journal {
    f: File,
    path: PathBuf,
    sync: bool,
}

pub fn write_header<W: Write>(mut w: W) -> std::io::Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&[VERSION])?;
    Ok(())
}

pub fn encode_record(rec: &LogRecord) -> Result<Vec<u8>, StoreError> {
    let plain = serde_cbor::to_vec(rec).map_err(|e| StoreError::Codec(e.to_string()))?;
    let mut out = Vec::with_capacity(uvarint_len(plain.len() as u64) + plain.len());
    put_uvarint(&mut out, plain.len() as u64);
    out.extend_from_slice(&plain);
    Ok(out)
}

impl Journal {
    pub fn open(path: &Path, sync: bool) -> Result<Self, StoreError> {
        let existed = path.exists() && std::fs::metadata(path)?.len() > 0;
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if !existed {
            write_header(&mut f)?;
            f.flush()?;
        } else {
            let mut magic = [0u8; 8];
            let mut ver = [0u8; 1];
            f.read_exact(&mut magic)
                .and_then(|_| f.read_exact(&mut ver))
                .map_err(|_| StoreError::Corrupt(format!("{}: short journal header", path.display())))?;
            if &magic != MAGIC {
                return Err(StoreError::Corrupt(format!("{}: bad journal magic", path.display())));
            }
            if ver[0] != VERSION {
                return Err(StoreError::Corrupt(format!(
                    "{}: unsupported journal version {}",
                    path.display(),
                    ver[0]
                )));
            }
        }
        f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
            sync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete record. A torn tail is truncated away so later
    /// appends start on a record boundary.
    pub fn replay(&mut self) -> Result<Vec<LogRecord>, StoreError> {
        self.f.seek(SeekFrom::Start(HEADER_LEN))?;
        let mut buf = Vec::new();
        self.f.read_to_end(&mut buf)?;

        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < buf.len() {
            let Some((len, vlen)) = get_uvarint(&buf[pos..]) else {
                break;
            };
            let start = pos + vlen;
            let end = match start.checked_add(len as usize) {
                Some(end) if end <= buf.len() => end,
                _ => break,
            };
            let rec: LogRecord = serde_cbor::from_slice(&buf[start..end]).map_err(|e| {
                StoreError::Corrupt(format!(
                    "{}: record at {}: {e}",
                    self.path.display(),
                    HEADER_LEN as usize + pos
                ))
            })?;
            out.push(rec);
            pos = end;
        }

        if pos < buf.len() {
            let keep = HEADER_LEN + pos as u64;
            tracing::warn!(
                journal = %self.path.display(),
                dropped = buf.len() - pos,
                "truncating torn journal tail"
            );
            self.f.set_len(keep)?;
        }
        self.f.seek(SeekFrom::End(0))?;
        Ok(out)
    }

    pub fn append(&mut self, rec: &LogRecord) -> Result<(), StoreError> {
        let bytes = encode_record(rec)?;
        let start = self.f.seek(SeekFrom::End(0))?;
        let res = self.f.write_all(&bytes).and_then(|_| self.f.flush()).and_then(|_| {
            if self.sync {
                self.f.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = res {
            // Never leave a half record in front of the next append.
            let _ = self.f.set_len(start);
            let _ = self.f.seek(SeekFrom::Start(start));
            return Err(StoreError::WriteFailed(e));
        }
        Ok(())
    }
}
