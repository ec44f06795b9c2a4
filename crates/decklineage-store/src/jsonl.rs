//! JSONL storage: one tagged record per line.
//!
//! The portable on-disk format for a permutation store. A file holds one
//! `sequence` record (the id allocator), one `deck` record per tracked
//! deck, and one `permutation` record per recorded version.

use crate::deck::DeckRecord;
use crate::permutation::Permutation;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of a permutation store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreRecord {
    Sequence { last_permutation_id: u64 },
    Deck(DeckRecord),
    Permutation(Permutation),
}

#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: read failed: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("line {line}: invalid record: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to encode record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{path}: corrupt store file ({reason})")]
    Corrupt { path: String, reason: &'static str },
}

fn io_at(path: &Path) -> impl Fn(io::Error) -> JsonlError + '_ {
    move |source| JsonlError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Parse records, skipping blank lines and `#` comments.
pub fn read_records(reader: impl BufRead) -> Result<Vec<StoreRecord>, JsonlError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| JsonlError::Read {
            line: line_no,
            source,
        })?;
        let body = line.trim();
        if body.is_empty() || body.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(body).map_err(|e| JsonlError::Parse {
            line: line_no,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_records(writer: &mut impl Write, records: &[StoreRecord]) -> Result<(), JsonlError> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n").map_err(JsonlError::Write)?;
    }
    Ok(())
}

/// Read a store file. NUL bytes and invalid UTF-8 mark the file corrupt.
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Vec<StoreRecord>, JsonlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(io_at(path))?;
    let corrupt = |reason| JsonlError::Corrupt {
        path: path.display().to_string(),
        reason,
    };
    if bytes.contains(&0) {
        return Err(corrupt("NUL byte"));
    }
    if std::str::from_utf8(&bytes).is_err() {
        return Err(corrupt("invalid UTF-8"));
    }
    read_records(bytes.as_slice())
}

/// Replace a store file atomically.
///
/// Records are written and synced to a sibling temp file, which is renamed
/// over the target. Readers see either the old or the new file.
pub fn write_records_to_path(
    path: impl AsRef<Path>,
    records: &[StoreRecord],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir).map_err(io_at(dir))?;
    }

    let staged = StagedFile::beside(path);
    let file = File::create(staged.path()).map_err(io_at(staged.path()))?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)?;
    let file = writer
        .into_inner()
        .map_err(|e| io_at(staged.path())(e.into_error()))?;
    file.sync_all().map_err(io_at(staged.path()))?;
    drop(file);
    staged.commit(path)?;

    if let Some(dir) = dir {
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(io_at(dir))?;
    }
    Ok(())
}

/// A temp file next to its target, removed on drop unless committed.
struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn beside(target: &Path) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let mut name = OsString::from(".");
        name.push(target.file_name().unwrap_or(OsStr::new("store")));
        name.push(format!(".{}-{nanos}.tmp", std::process::id()));
        Self {
            path: target.with_file_name(name),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, target: &Path) -> Result<(), JsonlError> {
        fs::rename(&self.path, target).map_err(io_at(target))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
