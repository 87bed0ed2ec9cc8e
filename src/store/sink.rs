use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::Deserialize;

use crate::error::{CutError, Result};

// ---------------------------------------------------------------------------
// Compression – pass-through writer setting
// ---------------------------------------------------------------------------

/// Compression codec of written tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "codec", rename_all = "lowercase")]
pub enum Compression {
    None,
    Snappy,
    Zstd { level: i32 },
}

impl Default for Compression {
    /// Medium zstd, a reasonable speed/size tradeoff.
    fn default() -> Self {
        Compression::Zstd { level: 5 }
    }
}

impl Compression {
    pub fn writer_properties(self) -> Result<WriterProperties> {
        let codec = match self {
            Compression::None => ParquetCompression::UNCOMPRESSED,
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Zstd { level } => ParquetCompression::ZSTD(ZstdLevel::try_new(level)?),
        };
        Ok(WriterProperties::builder().set_compression(codec).build())
    }
}

// ---------------------------------------------------------------------------
// TableSink – growable output table
// ---------------------------------------------------------------------------

/// Append-only writer for one output table.
///
/// Rows go to a hidden `.<name>.parquet.partial` file next to the target.
/// [`TableSink::finish`] renames it into place; dropping an unfinished sink
/// deletes it, so a failed copy never leaves a table under its final name.
pub struct TableSink {
    key: String,
    final_path: PathBuf,
    tmp_path: PathBuf,
    writer: Option<ArrowWriter<File>>,
    rows: u64,
    committed: bool,
}

impl TableSink {
    pub(crate) fn create(
        key: &str,
        final_path: PathBuf,
        schema: SchemaRef,
        props: WriterProperties,
    ) -> Result<Self> {
        let tmp_path = partial_path(&final_path);
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CutError::io(parent, e))?;
        }
        let file = File::create(&tmp_path).map_err(|e| CutError::io(&tmp_path, e))?;
        let writer = ArrowWriter::try_new(file, schema, Some(props))?;

        Ok(TableSink {
            key: key.to_string(),
            final_path,
            tmp_path,
            writer: Some(writer),
            rows: 0,
            committed: false,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rows appended so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append rows at the tail of the table.
    ///
    /// Every non-empty batch is flushed as its own row group so the writer
    /// never buffers more than one chunk.
    pub fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.num_rows() == 0 {
            return Ok(());
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CutError::SinkClosed(self.key.clone()))?;
        writer.write(batch)?;
        writer.flush()?;
        self.rows += batch.num_rows() as u64;
        Ok(())
    }

    /// Close the file and move it to its final name.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        std::fs::rename(&self.tmp_path, &self.final_path)
            .map_err(|e| CutError::io(&self.final_path, e))?;
        self.committed = true;
        Ok(self.rows)
    }
}

impl Drop for TableSink {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // close the handle before removing the file
        self.writer.take();
        if let Err(e) = std::fs::remove_file(&self.tmp_path) {
            log::warn!("Could not remove partial output {}: {e}", self.tmp_path.display());
        }
    }
}

fn partial_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, false)]))
    }

    fn batch(values: Vec<i64>) -> RecordBatch {
        RecordBatch::try_new(schema(), vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[test]
    fn finish_moves_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("group/table.parquet");
        let props = Compression::None.writer_properties().unwrap();

        let mut sink = TableSink::create("group/table", target.clone(), schema(), props).unwrap();
        sink.append(&batch(vec![1, 2])).unwrap();
        sink.append(&batch(vec![])).unwrap();
        sink.append(&batch(vec![3])).unwrap();
        assert!(!target.exists());
        assert!(dir.path().join("group/.table.parquet.partial").exists());

        assert_eq!(sink.finish().unwrap(), 3);
        assert!(target.exists());
        assert!(!dir.path().join("group/.table.parquet.partial").exists());
    }

    #[test]
    fn dropped_sink_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("table.parquet");
        let props = Compression::default().writer_properties().unwrap();

        let mut sink = TableSink::create("table", target.clone(), schema(), props).unwrap();
        sink.append(&batch(vec![1])).unwrap();
        drop(sink);

        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn compression_from_yaml() {
        let c: Compression = serde_yaml::from_str("{codec: zstd, level: 3}").unwrap();
        assert_eq!(c, Compression::Zstd { level: 3 });
        let c: Compression = serde_yaml::from_str("{codec: snappy}").unwrap();
        assert_eq!(c, Compression::Snappy);
        assert!(Compression::Zstd { level: 99 }.writer_properties().is_err());
    }
}
