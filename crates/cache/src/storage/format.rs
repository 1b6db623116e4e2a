//! Storage format definitions and header structures

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::path::Path;
use taskstate_core::{Error, ExecutionRecord, Result, TaskIdentity};

/// Magic number for history files: "TSH1"
pub const HISTORY_MAGIC: u32 = 0x5453_4831;

/// Current history format version
pub const HISTORY_FORMAT_VERSION: u16 = 1;

/// Binary header preceding every persisted record
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryHeader {
    /// Magic number for validation
    magic: u32,
    /// History format version
    version: u16,
    /// CRC32C of the header (computed with this field zeroed)
    header_crc: u32,
    /// Length of the payload in bytes
    payload_len: u64,
    /// CRC32C of the payload
    payload_crc: u32,
}

impl HistoryHeader {
    pub fn new(payload: &[u8]) -> Self {
        let mut header = Self {
            magic: HISTORY_MAGIC,
            version: HISTORY_FORMAT_VERSION,
            header_crc: 0,
            payload_len: payload.len() as u64,
            payload_crc: crc32c(payload),
        };
        header.header_crc = header.calculate_crc();
        header
    }

    fn calculate_crc(&self) -> u32 {
        let mut temp = *self;
        temp.header_crc = 0;

        match bincode::serialize(&temp) {
            Ok(bytes) => crc32c(&bytes),
            Err(_) => 0,
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.magic != HISTORY_MAGIC {
            return Err(Error::corrupt_history(
                path,
                format!(
                    "invalid magic number: expected {:08x}, got {:08x}",
                    HISTORY_MAGIC, self.magic
                ),
            ));
        }

        if self.version != HISTORY_FORMAT_VERSION {
            return Err(Error::corrupt_history(
                path,
                format!(
                    "unsupported history format version {} (expected {})",
                    self.version, HISTORY_FORMAT_VERSION
                ),
            ));
        }

        let expected_crc = self.calculate_crc();
        if self.header_crc != expected_crc {
            return Err(Error::corrupt_history(
                path,
                format!(
                    "header CRC mismatch: expected {:08x}, got {:08x}",
                    expected_crc, self.header_crc
                ),
            ));
        }

        Ok(())
    }
}

/// What one history file holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Guards against two identities hashing to the same file name
    pub task: TaskIdentity,
    pub record: ExecutionRecord,
}

/// Encode `record` for `task` as header followed by payload
pub fn encode_record(task: &TaskIdentity, record: &ExecutionRecord) -> Result<Vec<u8>> {
    let persisted = PersistedRecord {
        task: task.clone(),
        record: record.clone(),
    };
    let payload = bincode::serialize(&persisted)
        .map_err(|e| Error::serialization(format!("failed to encode history of '{task}'"), e))?;

    let header = HistoryHeader::new(&payload);
    let mut bytes = bincode::serialize(&header)
        .map_err(|e| Error::serialization("failed to encode history header", e))?;
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a history file read from `path`.
///
/// Any structural problem is reported as [`Error::CorruptHistory`].
pub fn decode_record(path: &Path, bytes: &[u8], verify_checksums: bool) -> Result<PersistedRecord> {
    let header: HistoryHeader = bincode::deserialize(bytes)
        .map_err(|e| Error::corrupt_history(path, format!("unreadable header: {e}")))?;
    header.validate(path)?;

    let header_size = bincode::serialized_size(&header)
        .map_err(|e| Error::corrupt_history(path, format!("unreadable header: {e}")))?
        as usize;

    let payload = bytes
        .get(header_size..)
        .filter(|payload| payload.len() as u64 == header.payload_len)
        .ok_or_else(|| {
            Error::corrupt_history(
                path,
                format!(
                    "truncated payload: expected {} bytes after header",
                    header.payload_len
                ),
            )
        })?;

    if verify_checksums {
        let actual_crc = crc32c(payload);
        if actual_crc != header.payload_crc {
            return Err(Error::corrupt_history(
                path,
                format!(
                    "payload CRC mismatch: expected {:08x}, got {:08x}",
                    header.payload_crc, actual_crc
                ),
            ));
        }
    }

    bincode::deserialize(payload)
        .map_err(|e| Error::corrupt_history(path, format!("unreadable payload: {e}")))
}
