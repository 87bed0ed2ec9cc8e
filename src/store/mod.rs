/// Store layer: a directory tree of Parquet tables.
///
/// ```text
///   <root>/
///     dl1/event/telescope/parameters/tel_001.parquet   key "dl1/event/telescope/parameters/tel_001"
///     dl1/event/telescope/images/tel_001.parquet       key "dl1/event/telescope/images/tel_001"
///     configuration/observation_block.parquet          key "configuration/observation_block"
/// ```
///
/// Directories are groups, `.parquet` files are tables. Hidden files are
/// ignored, which keeps in-progress outputs (see [`TableSink`]) invisible.

pub mod model;
pub mod sink;

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::file::properties::WriterProperties;

use crate::error::{CutError, Result};

pub use model::{column_rank, ColumnPlan, TableInfo};
pub use sink::{Compression, TableSink};

const TABLE_EXTENSION: &str = "parquet";

/// Handle on a store directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open an existing store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CutError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "store directory does not exist"),
            ));
        }
        Ok(Store { root })
    }

    /// Open a store for writing, creating the root directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| CutError::io(&root, e))?;
        Ok(Store { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing the table `key`.
    pub fn table_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut parts = key.split('/').filter(|p| !p.is_empty()).peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                path.push(part);
            } else {
                path.push(format!("{part}.{TABLE_EXTENSION}"));
            }
        }
        path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table_path(key).is_file()
    }

    /// All tables below the root, sorted by key.
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let mut keys = Vec::new();
        collect_keys(&self.root, "", &mut keys)?;
        keys.sort();
        keys.iter().map(|key| self.info(key)).collect()
    }

    /// Tables directly inside `group` (not in its subgroups), sorted by key.
    pub fn tables_in_group(&self, group: &str) -> Result<Vec<TableInfo>> {
        let group = group.trim_matches('/');
        Ok(self
            .tables()?
            .into_iter()
            .filter(|t| t.group() == group)
            .collect())
    }

    /// Schema and row count of one table, read from the Parquet footer.
    pub fn info(&self, key: &str) -> Result<TableInfo> {
        let builder = self.reader_builder(key)?;
        let rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
        Ok(TableInfo {
            key: key.to_string(),
            schema: builder.schema().clone(),
            rows,
        })
    }

    /// Total number of rows of a table.
    pub fn row_count(&self, key: &str) -> Result<u64> {
        Ok(self.info(key)?.rows)
    }

    pub fn schema(&self, key: &str) -> Result<SchemaRef> {
        Ok(self.info(key)?.schema)
    }

    /// Reader yielding consecutive chunks of `chunk_size` rows (the last one
    /// possibly shorter), in row order.
    pub fn chunk_reader(&self, key: &str, chunk_size: usize) -> Result<ParquetRecordBatchReader> {
        if chunk_size == 0 {
            return Err(CutError::InvalidChunkSize(chunk_size));
        }
        Ok(self.reader_builder(key)?.with_batch_size(chunk_size).build()?)
    }

    /// Start a new, empty output table. It becomes visible on
    /// [`TableSink::finish`].
    pub fn create_table(
        &self,
        key: &str,
        schema: SchemaRef,
        props: WriterProperties,
    ) -> Result<TableSink> {
        TableSink::create(key, self.table_path(key), schema, props)
    }

    fn reader_builder(&self, key: &str) -> Result<ParquetRecordBatchReaderBuilder<File>> {
        let path = self.table_path(key);
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CutError::TableNotFound(key.to_string()),
            _ => CutError::io(&path, e),
        })?;
        Ok(ParquetRecordBatchReaderBuilder::try_new(file)?)
    }
}

/// Make `output` ready to receive a filtered copy of the store at `input`.
///
/// Refuses an output that is, contains or lies inside the input store. An
/// existing non-empty output is removed only with `overwrite`.
pub fn prepare_output(input: &Path, output: &Path, overwrite: bool) -> Result<()> {
    let input_abs = resolve(input)?;
    let output_abs = resolve(output)?;
    if input_abs.starts_with(&output_abs) || output_abs.starts_with(&input_abs) {
        return Err(CutError::OutputOverlapsInput {
            input: input.display().to_string(),
            output: output.display().to_string(),
        });
    }

    if !output.exists() {
        return Ok(());
    }
    let is_dir = output.is_dir();
    let non_empty = !is_dir
        || std::fs::read_dir(output)
            .map_err(|e| CutError::io(output, e))?
            .next()
            .is_some();
    if !non_empty {
        return Ok(());
    }
    if !overwrite {
        return Err(CutError::OutputNotEmpty(output.display().to_string()));
    }

    log::info!("Removing existing output {}", output.display());
    let removed = if is_dir {
        std::fs::remove_dir_all(output)
    } else {
        std::fs::remove_file(output)
    };
    removed.map_err(|e| CutError::io(output, e))
}

/// Absolute, symlink-free form of `path`, which need not exist yet.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CutError::io(path, e))?
            .join(path)
    };

    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .map_err(|e| CutError::io(existing, e))?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| CutError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CutError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let child_key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        if path.is_dir() {
            collect_keys(&path, &child_key, keys)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(TABLE_EXTENSION) {
            let key = child_key
                .strip_suffix(".parquet")
                .unwrap_or(&child_key)
                .to_string();
            keys.push(key);
        }
    }
    Ok(())
}
