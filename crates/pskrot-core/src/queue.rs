// ── PSK queue file ──
//
// One candidate key per CSV record (first field). Any further fields ride
// along with their key and are written back untouched. The file is read in
// full, and rewritten in full through a temp file in the same directory
// followed by a rename, so a crash never leaves a half-written queue.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("PSK file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read PSK file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write PSK file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered list of keys waiting to be rotated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskQueue {
    path: PathBuf,
    /// Non-empty first field of every record is the key.
    records: VecDeque<StringRecord>,
}

impl PskQueue {
    /// Build a queue in memory, bound to `path` for [`persist`](Self::persist).
    pub fn new(path: impl Into<PathBuf>, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            path: path.into(),
            records: keys
                .into_iter()
                .map(|key| StringRecord::from(vec![key]))
                .collect(),
        }
    }

    /// Read every record of the CSV file at `path`.
    ///
    /// Records whose first field is empty are skipped; extra fields are kept.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(QueueError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let read_err = |source| QueueError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        let mut records = VecDeque::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            if record.get(0).is_some_and(|k| !k.is_empty()) {
                records.push_back(record);
            }
        }
        debug!(path = %path.display(), keys = records.len(), "loaded PSK queue");

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|record| record.get(0))
    }

    /// Remove the head of the queue and return its key. With `reuse`, the
    /// whole record is appended to the tail again so the queue cycles.
    pub fn take_next(&mut self, reuse: bool) -> Option<String> {
        let record = self.records.pop_front()?;
        let key = record.get(0).unwrap_or_default().to_owned();
        if reuse {
            self.records.push_back(record);
        }
        Some(key)
    }

    /// Atomically replace the file with the current contents.
    pub fn persist(&self) -> Result<(), QueueError> {
        let write_err = |source| QueueError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(tmp.as_file_mut());
            for record in &self.records {
                writer
                    .write_record(record)
                    .map_err(|e| write_err(std::io::Error::other(e)))?;
            }
            writer.flush().map_err(write_err)?;
        }
        tmp.as_file_mut().flush().map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), keys = self.records.len(), "persisted PSK queue");
        Ok(())
    }
}
