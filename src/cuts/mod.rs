/// Cut application: streaming copies of whole tables and table families.
///
/// ```text
///   apply_cuts_chunked            apply_cuts_cascade
///         │                               │
///         │              ┌────────────────┴─────────────────┐
///         │              │ phase 1: parameter tables         │
///         │              │   SelectionFilter + key capture   │
///         │              │        ──► SurvivorKeySet         │
///         │              │ phase 2: all other tables         │
///         │              │   MembershipFilter / KeepAll      │
///         │              └────────────────┬─────────────────┘
///         ▼                               ▼
///   ┌─────────────────────────────────────────────┐
///   │ copy_filtered: chunk → mask → project →      │
///   │                filter → append (TableSink)   │
///   └─────────────────────────────────────────────┘
/// ```

pub mod cascade;
pub mod chunked;
pub mod keys;

use std::path::Path;

use crate::error::{CutError, Result};
use crate::selection::{compile, query_string, CompiledCriterion, SelectionConfig};
use crate::store::{prepare_output, Store};

pub use cascade::{apply_cascade, check_parameter_tables, CascadeOptions};
pub use chunked::{copy_filtered, plan_chunks, Chunk, ChunkFilter, CopyOptions, CopyStats, KeepAll, SelectionFilter};
pub use keys::{CompositeKey, SurvivorKeySet, SurvivorKeysBuilder};

/// Filter one table of the store at `input` into the store at `output`,
/// holding at most `chunk_size` rows in memory.
pub fn apply_cuts_chunked(
    input: &Path,
    output: &Path,
    selection: &SelectionConfig,
    table_key: &str,
    chunk_size: usize,
    report_progress: bool,
) -> Result<CopyStats> {
    let options = CopyOptions {
        chunk_size,
        report_progress,
        ..CopyOptions::default()
    };
    apply_cuts_chunked_with(input, output, selection, table_key, &options)
}

/// [`apply_cuts_chunked`] with explicit copy options.
pub fn apply_cuts_chunked_with(
    input: &Path,
    output: &Path,
    selection: &SelectionConfig,
    table_key: &str,
    options: &CopyOptions,
) -> Result<CopyStats> {
    let criteria = check_chunked(input, selection, table_key, options)?;
    log::debug!("Applying {}", query_string(&criteria));

    let input = Store::open(input)?;
    let output = Store::create(output)?;
    let mut filter = SelectionFilter::new(&criteria);
    copy_filtered(&input, table_key, &output, &mut filter, options)
}

/// Compile `selection` and check it against `table_key` of the store at
/// `input`. Nothing is written.
pub fn check_chunked(
    input: &Path,
    selection: &SelectionConfig,
    table_key: &str,
    options: &CopyOptions,
) -> Result<Vec<CompiledCriterion>> {
    let criteria = compile(selection)?;
    if options.chunk_size == 0 {
        return Err(CutError::InvalidChunkSize(options.chunk_size));
    }

    let schema = Store::open(input)?.schema(table_key)?;
    if let Some(c) = criteria
        .iter()
        .find(|c| schema.column_with_name(&c.column).is_none())
    {
        return Err(CutError::UnknownColumn {
            column: c.column.clone(),
            table: table_key.to_string(),
        });
    }
    Ok(criteria)
}

/// Validate, then replace whatever is at `output` with the filtered table.
///
/// The output is only cleared (see [`prepare_output`]) once the selection
/// is known to apply to the input.
pub fn run_chunked(
    input: &Path,
    output: &Path,
    selection: &SelectionConfig,
    table_key: &str,
    options: &CopyOptions,
    overwrite: bool,
) -> Result<CopyStats> {
    check_chunked(input, selection, table_key, options)?;
    prepare_output(input, output, overwrite)?;
    apply_cuts_chunked_with(input, output, selection, table_key, options)
}

/// Filter a DL1-like store with default cascade options.
///
/// Returns `(rows_before, rows_after)` over the parameter tables.
pub fn apply_cuts_cascade(input: &Path, output: &Path, selection: &SelectionConfig) -> Result<(u64, u64)> {
    let stats = apply_cuts_cascade_with(input, output, selection, &CascadeOptions::default())?;
    Ok((stats.rows_before, stats.rows_after))
}

/// [`apply_cuts_cascade`] with explicit options.
pub fn apply_cuts_cascade_with(
    input: &Path,
    output: &Path,
    selection: &SelectionConfig,
    options: &CascadeOptions,
) -> Result<CopyStats> {
    let criteria = check_cascade(input, selection, options)?;
    log::debug!("Applying {}", query_string(&criteria));

    let input = Store::open(input)?;
    let output = Store::create(output)?;
    apply_cascade(&input, &output, &criteria, options)
}

/// Compile `selection` and check it against every parameter table of the
/// store at `input`. Nothing is written.
pub fn check_cascade(
    input: &Path,
    selection: &SelectionConfig,
    options: &CascadeOptions,
) -> Result<Vec<CompiledCriterion>> {
    let criteria = compile(selection)?;
    if options.copy.chunk_size == 0 {
        return Err(CutError::InvalidChunkSize(options.copy.chunk_size));
    }
    check_parameter_tables(&Store::open(input)?, &criteria, options)?;
    Ok(criteria)
}

/// Cascade counterpart of [`run_chunked`].
pub fn run_cascade(
    input: &Path,
    output: &Path,
    selection: &SelectionConfig,
    options: &CascadeOptions,
    overwrite: bool,
) -> Result<CopyStats> {
    check_cascade(input, selection, options)?;
    prepare_output(input, output, overwrite)?;
    apply_cuts_cascade_with(input, output, selection, options)
}
