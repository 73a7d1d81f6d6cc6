use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const BATCH_PREFIX: &str = "batch-";
const BATCH_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Batch file '{path}' has no '{column}' column")]
    MissingKeyColumn { path: String, column: String },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> StoreError + '_ {
    move |source| StoreError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn batch_index(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != BATCH_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(BATCH_PREFIX)?
        .parse()
        .ok()
}

/// A directory of numbered CSV batch files that lets interrupted runs resume.
///
/// Every file carries a key column; keys found in existing files count as
/// completed and new batches are numbered after the highest existing one.
#[derive(Debug)]
pub struct BatchStore {
    dir: PathBuf,
    completed: BTreeSet<String>,
    next_index: usize,
}

impl BatchStore {
    pub fn open(dir: &Path, key_column: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;

        let mut batch_files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error(dir))? {
            let path = entry.map_err(io_error(dir))?.path();
            if let Some(index) = batch_index(&path) {
                batch_files.push((index, path));
            }
        }
        batch_files.sort();

        let mut completed = BTreeSet::new();
        for (_, path) in &batch_files {
            completed.extend(read_keys(path, key_column)?);
        }
        let next_index = batch_files.last().map_or(0, |(index, _)| index + 1);
        if !batch_files.is_empty() {
            info!(
                dir = %dir.display(),
                batches = batch_files.len(),
                completed = completed.len(),
                "Resuming from existing batch files"
            );
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            completed,
            next_index,
        })
    }

    pub fn is_complete(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Writes `rows` as the next numbered batch. Empty batches write nothing.
    ///
    /// The file appears under its final name only once fully written, so a
    /// crash never leaves a partial batch behind.
    pub fn write_batch<R, K>(
        &mut self,
        rows: &[R],
        key_of: K,
    ) -> Result<Option<PathBuf>, StoreError>
    where
        R: Serialize,
        K: Fn(&R) -> String,
    {
        if rows.is_empty() {
            return Ok(None);
        }
        let name = format!("{}{:04}.{}", BATCH_PREFIX, self.next_index, BATCH_EXTENSION);
        let path = self.dir.join(&name);
        let partial = self.dir.join(format!(".{}.partial", name));

        {
            let mut writer = csv::Writer::from_path(&partial).map_err(csv_error(&partial))?;
            for row in rows {
                writer.serialize(row).map_err(csv_error(&partial))?;
            }
            writer.flush().map_err(io_error(&partial))?;
        }
        fs::rename(&partial, &path).map_err(io_error(&path))?;

        self.completed.extend(rows.iter().map(key_of));
        self.next_index += 1;
        debug!(path = %path.display(), rows = rows.len(), "Batch written");
        Ok(Some(path))
    }

    /// Paths of every batch file in index order.
    pub fn batch_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files: Vec<(usize, PathBuf)> = fs::read_dir(&self.dir)
            .map_err(io_error(&self.dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| batch_index(&path).map(|index| (index, path)))
            .collect();
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }
}

fn read_keys(path: &Path, key_column: &str) -> Result<Vec<String>, StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error(path))?;
    let headers = reader.headers().map_err(csv_error(path))?;
    let column = headers
        .iter()
        .position(|h| h == key_column)
        .ok_or_else(|| StoreError::MissingKeyColumn {
            path: path.to_string_lossy().to_string(),
            column: key_column.to_string(),
        })?;
    let mut keys = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error(path))?;
        if let Some(key) = record.get(column) {
            keys.push(key.to_string());
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Row {
        record_id: u64,
        value: f64,
    }

    fn rows(ids: &[u64]) -> Vec<Row> {
        ids.iter()
            .map(|&record_id| Row {
                record_id,
                value: record_id as f64 * 0.5,
            })
            .collect()
    }

    #[test]
    fn fresh_directory_starts_at_zero() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let store = BatchStore::open(&out, "record_id").unwrap();
        assert!(out.is_dir());
        assert_eq!(store.next_index(), 0);
        assert!(!store.is_complete("1"));
    }

    #[test]
    fn written_batches_are_seen_on_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = BatchStore::open(dir.path(), "record_id").unwrap();
            let first = store
                .write_batch(&rows(&[1, 2]), |r| r.record_id.to_string())
                .unwrap()
                .unwrap();
            assert!(first.ends_with("batch-0000.csv"));
            store
                .write_batch(&rows(&[3]), |r| r.record_id.to_string())
                .unwrap();
            assert!(store.is_complete("3"));
        }
        let store = BatchStore::open(dir.path(), "record_id").unwrap();
        assert_eq!(store.next_index(), 2);
        assert!(store.is_complete("1") && store.is_complete("2") && store.is_complete("3"));
        assert!(!store.is_complete("4"));
        assert_eq!(store.batch_files().unwrap().len(), 2);
    }

    #[test]
    fn empty_batches_are_not_written() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path(), "record_id").unwrap();
        let written = store
            .write_batch(&Vec::<Row>::new(), |r| r.record_id.to_string())
            .unwrap();
        assert_eq!(written, None);
        assert_eq!(store.next_index(), 0);
    }

    #[test]
    fn numbering_continues_after_gaps_and_ignores_other_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("batch-0007.csv"), "record_id,value\n10,1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a batch").unwrap();
        let store = BatchStore::open(dir.path(), "record_id").unwrap();
        assert_eq!(store.next_index(), 8);
        assert!(store.is_complete("10"));
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("batch-0000.csv"), "id,value\n10,1\n").unwrap();
        let result = BatchStore::open(dir.path(), "record_id");
        assert!(matches!(result, Err(StoreError::MissingKeyColumn { .. })));
    }
}
