use std::ops::AddAssign;

use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;

use crate::error::{CutError, Result};
use crate::selection::{evaluate, CompiledCriterion};
use crate::store::{ColumnPlan, Compression, Store};

// ---------------------------------------------------------------------------
// Chunk planning
// ---------------------------------------------------------------------------

/// Half-open row range `[start, end)` of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Split `[0, total_rows)` into consecutive chunks of `chunk_size` rows.
pub fn plan_chunks(total_rows: u64, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(CutError::InvalidChunkSize(chunk_size));
    }
    let size = chunk_size as u64;
    Ok((0..total_rows.div_ceil(size))
        .map(|i| Chunk {
            start: i * size,
            end: ((i + 1) * size).min(total_rows),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Row filters
// ---------------------------------------------------------------------------

/// Decides, chunk by chunk, which rows of a table are copied.
pub trait ChunkFilter {
    /// Mask over the rows of `batch`, which holds the rows of `chunk`.
    fn select(&mut self, table: &str, chunk: &Chunk, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Called with the rows of every chunk that were kept.
    fn observe_kept(&mut self, _table: &str, _kept: &RecordBatch) -> Result<()> {
        Ok(())
    }
}

/// Keeps rows passing compiled selection criteria.
pub struct SelectionFilter<'a> {
    criteria: &'a [CompiledCriterion],
}

impl<'a> SelectionFilter<'a> {
    pub fn new(criteria: &'a [CompiledCriterion]) -> Self {
        SelectionFilter { criteria }
    }
}

impl ChunkFilter for SelectionFilter<'_> {
    fn select(&mut self, table: &str, chunk: &Chunk, batch: &RecordBatch) -> Result<BooleanArray> {
        let outcome = evaluate(batch, table, self.criteria)?;
        log::debug!(
            "{table} [{}, {}): {} of {} rows pass",
            chunk.start,
            chunk.end,
            outcome.selected(),
            chunk.len()
        );
        Ok(outcome.mask)
    }
}

/// Keeps every row.
pub struct KeepAll;

impl ChunkFilter for KeepAll {
    fn select(&mut self, _table: &str, _chunk: &Chunk, batch: &RecordBatch) -> Result<BooleanArray> {
        Ok(BooleanArray::from(vec![true; batch.num_rows()]))
    }
}

// ---------------------------------------------------------------------------
// Chunked filtered copy
// ---------------------------------------------------------------------------

/// Settings shared by all copies of one run.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Upper bound of rows held in memory at once.
    pub chunk_size: usize,
    pub compression: Compression,
    /// Log an `info` line per chunk.
    pub report_progress: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        CopyOptions {
            chunk_size: 100_000,
            compression: Compression::default(),
            report_progress: false,
        }
    }
}

/// Row counts of a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub rows_before: u64,
    pub rows_after: u64,
}

impl AddAssign for CopyStats {
    fn add_assign(&mut self, other: Self) {
        self.rows_before += other.rows_before;
        self.rows_after += other.rows_after;
    }
}

/// Copy table `key` of `input` to the same key in `output`, keeping the rows
/// `filter` selects.
///
/// Chunks are read, filtered and appended strictly in row order, so the
/// output keeps the input's row order whatever the chunk size. Columns of
/// rank other than 1 or 2 are left out with a warning. The output table only
/// appears once every chunk has been written.
pub fn copy_filtered<F: ChunkFilter>(
    input: &Store,
    key: &str,
    output: &Store,
    filter: &mut F,
    options: &CopyOptions,
) -> Result<CopyStats> {
    let info = input.info(key)?;
    let chunks = plan_chunks(info.rows, options.chunk_size)?;
    log::debug!(
        "Using {} chunks of size {} for `{key}`",
        chunks.len(),
        options.chunk_size
    );

    let plan = ColumnPlan::for_schema(&info.schema);
    for (column, rank) in &plan.skipped {
        let skipped = CutError::UnsupportedColumnRank {
            table: key.to_string(),
            column: column.clone(),
            rank: *rank,
        };
        log::warn!("{skipped}");
    }

    let mut reader = input.chunk_reader(key, options.chunk_size)?;
    let mut sink = output.create_table(
        key,
        plan.schema.clone(),
        options.compression.writer_properties()?,
    )?;

    let n_chunks = chunks.len();
    let mut rows_after = 0u64;
    for (i, chunk) in chunks.iter().enumerate() {
        let mismatch = |rows| CutError::ChunkMismatch {
            table: key.to_string(),
            start: chunk.start,
            end: chunk.end,
            rows,
        };
        let batch = reader.next().transpose()?.ok_or_else(|| mismatch(0))?;
        if batch.num_rows() != chunk.len() {
            return Err(mismatch(batch.num_rows()));
        }

        let mask = filter.select(key, chunk, &batch)?;
        let projected = if plan.is_identity() {
            batch
        } else {
            batch.project(&plan.projection)?
        };
        let kept = filter_record_batch(&projected, &mask)?;

        filter.observe_kept(key, &kept)?;
        sink.append(&kept)?;
        rows_after += kept.num_rows() as u64;

        if options.report_progress {
            log::info!("{key}: chunk {}/{n_chunks}, {rows_after} rows kept so far", i + 1);
        }
    }

    sink.finish()?;
    Ok(CopyStats {
        rows_before: info.rows,
        rows_after,
    })
}
