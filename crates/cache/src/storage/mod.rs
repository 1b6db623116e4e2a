//! On-disk encoding of persisted task history
//!
//! Each record is a small binary file:
//! - a fixed header with magic number, format version and CRC32C checksums
//! - a bincode payload holding the task identity and its execution record
//!
//! Records written by an older format version are rejected on read, which
//! the history store turns into "no history".

mod format;

pub use format::{
    decode_record, encode_record, HistoryHeader, PersistedRecord, HISTORY_FORMAT_VERSION,
    HISTORY_MAGIC,
};
