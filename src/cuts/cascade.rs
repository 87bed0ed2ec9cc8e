use arrow::array::BooleanArray;
use arrow::record_batch::RecordBatch;

use super::chunked::{copy_filtered, Chunk, ChunkFilter, CopyOptions, CopyStats, KeepAll, SelectionFilter};
use super::keys::{SurvivorKeySet, SurvivorKeysBuilder};
use crate::error::{CutError, Result};
use crate::selection::CompiledCriterion;
use crate::store::{Store, TableInfo};

/// Where the parameter tables live and how rows are linked across tables.
#[derive(Debug, Clone)]
pub struct CascadeOptions {
    /// Group whose tables the selection is applied to.
    pub parameters_group: String,
    /// Columns forming the composite event key.
    pub key_columns: Vec<String>,
    pub copy: CopyOptions,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        CascadeOptions {
            parameters_group: "dl1/event/telescope/parameters".to_string(),
            key_columns: vec!["obs_id".to_string(), "event_id".to_string()],
            copy: CopyOptions::default(),
        }
    }
}

/// Selection filter that also records the keys of kept rows.
struct CollectingFilter<'a> {
    selection: SelectionFilter<'a>,
    survivors: &'a mut SurvivorKeysBuilder,
    key_columns: &'a [String],
}

impl ChunkFilter for CollectingFilter<'_> {
    fn select(&mut self, table: &str, chunk: &Chunk, batch: &RecordBatch) -> Result<BooleanArray> {
        self.selection.select(table, chunk, batch)
    }

    fn observe_kept(&mut self, table: &str, kept: &RecordBatch) -> Result<()> {
        self.survivors.extend_from_batch(kept, table, self.key_columns)
    }
}

/// Keeps rows whose key survived the parameter selection.
struct MembershipFilter<'a> {
    survivors: &'a SurvivorKeySet,
    key_columns: &'a [String],
}

impl ChunkFilter for MembershipFilter<'_> {
    fn select(&mut self, table: &str, _chunk: &Chunk, batch: &RecordBatch) -> Result<BooleanArray> {
        self.survivors.mask(batch, table, self.key_columns)
    }
}

/// Apply `criteria` to the parameter tables and carry the outcome over to
/// every other table of the store.
///
/// Phase 1 copies each parameter table with the selection and collects the
/// keys of surviving rows. Only once all parameter tables are done is the
/// key set frozen; phase 2 then copies every remaining table, keeping a row
/// iff its key survived. Tables without the key columns are copied whole.
///
/// Returns row counts summed over the parameter tables.
pub fn apply_cascade(
    input: &Store,
    output: &Store,
    criteria: &[CompiledCriterion],
    options: &CascadeOptions,
) -> Result<CopyStats> {
    let tables = input.tables()?;
    let group = options.parameters_group.trim_matches('/');
    let (parameters, dependents): (Vec<TableInfo>, Vec<TableInfo>) =
        tables.into_iter().partition(|t| t.group() == group);

    if parameters.is_empty() {
        log::warn!("No parameter tables found in group `{group}`");
    }
    for table in &parameters {
        check_parameter_table(table, criteria, &options.key_columns)?;
    }

    // Phase 1: parameter tables
    let mut builder = SurvivorKeysBuilder::new();
    let mut totals = CopyStats::default();
    for table in &parameters {
        let mut filter = CollectingFilter {
            selection: SelectionFilter::new(criteria),
            survivors: &mut builder,
            key_columns: &options.key_columns,
        };
        let stats = copy_filtered(input, &table.key, output, &mut filter, &options.copy)?;
        log::info!(
            "{}: kept {} of {} rows",
            table.key,
            stats.rows_after,
            stats.rows_before
        );
        totals += stats;
    }
    let survivors = builder.freeze();
    log::info!("{} events survive the selection", survivors.len());

    // Phase 2: everything else, only reading the frozen key set
    for table in &dependents {
        copy_dependent(input, output, table, &survivors, options)?;
    }

    Ok(totals)
}

/// Check that every parameter table carries the selected columns and the
/// key columns.
pub fn check_parameter_tables(
    input: &Store,
    criteria: &[CompiledCriterion],
    options: &CascadeOptions,
) -> Result<()> {
    for table in input.tables_in_group(&options.parameters_group)? {
        check_parameter_table(&table, criteria, &options.key_columns)?;
    }
    Ok(())
}

fn check_parameter_table(
    table: &TableInfo,
    criteria: &[CompiledCriterion],
    key_columns: &[String],
) -> Result<()> {
    if let Some(c) = criteria
        .iter()
        .find(|c| table.schema.column_with_name(&c.column).is_none())
    {
        return Err(CutError::UnknownColumn {
            column: c.column.clone(),
            table: table.key.clone(),
        });
    }
    let missing: Vec<String> = key_columns
        .iter()
        .filter(|c| table.schema.column_with_name(c).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CutError::MissingKeyColumns {
            table: table.key.clone(),
            missing,
        });
    }
    Ok(())
}

fn copy_dependent(
    input: &Store,
    output: &Store,
    table: &TableInfo,
    survivors: &SurvivorKeySet,
    options: &CascadeOptions,
) -> Result<CopyStats> {
    let present = options
        .key_columns
        .iter()
        .filter(|c| table.schema.column_with_name(c).is_some())
        .count();

    let stats = if present == options.key_columns.len() {
        let mut filter = MembershipFilter {
            survivors,
            key_columns: &options.key_columns,
        };
        copy_filtered(input, &table.key, output, &mut filter, &options.copy)?
    } else {
        if present > 0 {
            log::warn!(
                "{} has only some of the key columns [{}], copying it unfiltered",
                table.key,
                options.key_columns.join(", ")
            );
        }
        copy_filtered(input, &table.key, output, &mut KeepAll, &options.copy)?
    };

    log::debug!(
        "{}: kept {} of {} rows",
        table.key,
        stats.rows_after,
        stats.rows_before
    );
    Ok(stats)
}
