//! Checksummed snapshot files for sorted tables
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE)
//! +------------------+
//! | Record Body      | (JSON, one key and its values)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of the body)
//! +------------------+
//! ```
//!
//! A snapshot is written to `<name>.tbl.tmp`, fsynced, then renamed over
//! `<name>.tbl`, so a crash leaves either the old or the new snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{TableError, TableResult};

/// Path of the snapshot file for table `name` in `dir`
pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.tbl", name))
}

/// Encodes one record: length, body, checksum.
fn encode_record(body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 8);
    buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
    buf.extend_from_slice(body);
    buf.extend_from_slice(&compute_checksum(body).to_le_bytes());
    buf
}

/// Atomically replaces the snapshot at `path` with `records`.
pub fn write_records(path: &Path, table: &str, records: &[Vec<u8>]) -> TableResult<()> {
    let tmp = path.with_extension("tbl.tmp");

    let mut file = File::create(&tmp).map_err(|e| {
        TableError::write_failed(table, format!("Failed to create {}", tmp.display()), Some(e))
    })?;
    for body in records {
        file.write_all(&encode_record(body)).map_err(|e| {
            TableError::write_failed(table, format!("Failed to write {}", tmp.display()), Some(e))
        })?;
    }
    file.sync_all().map_err(|e| {
        TableError::write_failed(table, format!("fsync failed for {}", tmp.display()), Some(e))
    })?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| {
        TableError::write_failed(table, format!("Failed to rename {}", tmp.display()), Some(e))
    })?;

    if let Some(dir) = path.parent() {
        fsync_dir(dir)?;
    }
    Ok(())
}

/// Reads every record body, validating lengths and checksums.
pub fn read_records(path: &Path, table: &str) -> TableResult<Vec<Vec<u8>>> {
    let bytes = fs::read(path).map_err(|e| {
        TableError::read_failed(table, format!("Failed to read {}", path.display()), e)
    })?;

    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let header = bytes
            .get(offset..offset + 4)
            .ok_or_else(|| TableError::corruption_at_offset(table, offset as u64, "truncated length"))?;
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;

        let body_start = offset + 4;
        let body = bytes
            .get(body_start..body_start + len)
            .ok_or_else(|| TableError::corruption_at_offset(table, offset as u64, "truncated record"))?;
        let crc = bytes
            .get(body_start + len..body_start + len + 4)
            .ok_or_else(|| TableError::corruption_at_offset(table, offset as u64, "truncated checksum"))?;
        let expected = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);

        if !verify_checksum(body, expected) {
            return Err(TableError::corruption_at_offset(
                table,
                offset as u64,
                "checksum mismatch",
            ));
        }

        records.push(body.to_vec());
        offset = body_start + len + 4;
    }
    Ok(records)
}

/// fsync a directory so a completed rename survives a crash.
fn fsync_dir(path: &Path) -> TableResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| TableError::io_error(format!("Failed to open {}", path.display()), e))?;

    dir.sync_all()
        .map_err(|e| TableError::io_error(format!("fsync directory failed: {}", path.display()), e))
}
