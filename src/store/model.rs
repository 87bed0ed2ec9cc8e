use std::sync::Arc;

use arrow::datatypes::{DataType, Schema, SchemaRef};

// ---------------------------------------------------------------------------
// TableInfo – what table discovery reports
// ---------------------------------------------------------------------------

/// A table found in a store.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// `/`-separated path relative to the store root, without extension.
    pub key: String,
    pub schema: SchemaRef,
    pub rows: u64,
}

impl TableInfo {
    /// Group (parent path) of the table, `""` for top-level tables.
    pub fn group(&self) -> &str {
        self.key.rsplit_once('/').map(|(group, _)| group).unwrap_or("")
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.key.rsplit_once('/').map(|(_, name)| name).unwrap_or(&self.key)
    }

    pub fn has_columns<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        columns
            .iter()
            .all(|c| self.schema.column_with_name(c.as_ref()).is_some())
    }
}

// ---------------------------------------------------------------------------
// Column rank
// ---------------------------------------------------------------------------

/// Number of array dimensions a column has per table.
///
/// Scalars are rank 1 (one value per row); each level of list nesting adds
/// a dimension, so `FixedSizeList<f32>` is rank 2.
pub fn column_rank(data_type: &DataType) -> usize {
    match data_type {
        DataType::FixedSizeList(inner, _)
        | DataType::List(inner)
        | DataType::LargeList(inner) => 1 + column_rank(inner.data_type()),
        _ => 1,
    }
}

/// Which columns of a table can be copied.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    /// Indices of the copied columns in the source schema.
    pub projection: Vec<usize>,
    /// Schema of the output table.
    pub schema: SchemaRef,
    /// Omitted columns with their rank.
    pub skipped: Vec<(String, usize)>,
}

impl ColumnPlan {
    /// Keep rank-1 and rank-2 columns, in source order.
    pub fn for_schema(schema: &Schema) -> Self {
        let mut projection = Vec::with_capacity(schema.fields().len());
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut skipped = Vec::new();

        for (idx, field) in schema.fields().iter().enumerate() {
            match column_rank(field.data_type()) {
                1 | 2 => {
                    projection.push(idx);
                    fields.push(field.clone());
                }
                rank => skipped.push((field.name().clone(), rank)),
            }
        }

        ColumnPlan {
            projection,
            schema: Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
            skipped,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.skipped.is_empty()
    }
}
