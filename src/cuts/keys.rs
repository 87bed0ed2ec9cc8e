use std::collections::HashSet;

use arrow::array::{Array, AsArray, BooleanArray, BooleanBuilder, Int64Array};
use arrow::datatypes::Int64Type;
use arrow::record_batch::RecordBatch;

use crate::error::{CutError, Result};
use crate::selection::mask::cast_to_i64;

/// Values of the key columns of one row, in key-column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(pub Vec<i64>);

impl From<(i64, i64)> for CompositeKey {
    fn from((a, b): (i64, i64)) -> Self {
        CompositeKey(vec![a, b])
    }
}

/// Collects survivor keys while parameter tables are copied.
#[derive(Debug, Default)]
pub struct SurvivorKeysBuilder {
    keys: HashSet<CompositeKey>,
}

impl SurvivorKeysBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the keys of every row in `batch`.
    pub fn extend_from_batch(&mut self, batch: &RecordBatch, table: &str, columns: &[String]) -> Result<()> {
        let key_arrays = key_arrays(batch, table, columns)?;
        for row in 0..batch.num_rows() {
            if key_arrays.iter().all(|a| a.is_valid(row)) {
                self.keys.insert(key_at(&key_arrays, row));
            }
        }
        Ok(())
    }

    /// Stop collecting. The returned set cannot be modified.
    pub fn freeze(self) -> SurvivorKeySet {
        SurvivorKeySet { keys: self.keys }
    }
}

/// Keys of all parameter-table rows that passed the selection.
#[derive(Debug, Clone)]
pub struct SurvivorKeySet {
    keys: HashSet<CompositeKey>,
}

impl SurvivorKeySet {
    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Membership mask for the rows of `batch`.
    pub fn mask(&self, batch: &RecordBatch, table: &str, columns: &[String]) -> Result<BooleanArray> {
        let key_arrays = key_arrays(batch, table, columns)?;
        let mut builder = BooleanBuilder::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let present = key_arrays.iter().all(|a| a.is_valid(row));
            builder.append_value(present && self.keys.contains(&key_at(&key_arrays, row)));
        }
        Ok(builder.finish())
    }
}

/// Key columns of a batch as `Int64` arrays.
fn key_arrays(batch: &RecordBatch, table: &str, columns: &[String]) -> Result<Vec<Int64Array>> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| batch.column_by_name(c).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CutError::MissingKeyColumns {
            table: table.to_string(),
            missing,
        });
    }

    columns
        .iter()
        .map(|name| {
            let column = batch.column_by_name(name).ok_or_else(|| CutError::MissingKeyColumns {
                table: table.to_string(),
                missing: vec![name.clone()],
            })?;
            if !column.data_type().is_integer() {
                return Err(CutError::InvalidKeyColumn {
                    table: table.to_string(),
                    column: name.clone(),
                    data_type: column.data_type().clone(),
                });
            }
            let as_i64 = cast_to_i64(column)?;
            Ok(as_i64.as_primitive::<Int64Type>().clone())
        })
        .collect()
}

fn key_at(arrays: &[Int64Array], row: usize) -> CompositeKey {
    CompositeKey(arrays.iter().map(|a| a.value(row)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int16Array, Int32Array, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn keys() -> Vec<String> {
        vec!["obs_id".into(), "event_id".into()]
    }

    fn batch(obs: Vec<i32>, events: Vec<i16>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("obs_id", DataType::Int32, false),
            Field::new("event_id", DataType::Int16, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![Arc::new(Int32Array::from(obs)), Arc::new(Int16Array::from(events))],
        )
        .unwrap()
    }

    #[test]
    fn membership_mask() {
        let mut builder = SurvivorKeysBuilder::new();
        builder
            .extend_from_batch(&batch(vec![1, 2], vec![1, 1]), "params", &keys())
            .unwrap();
        let survivors = builder.freeze();
        assert_eq!(survivors.len(), 2);
        assert!(survivors.contains(&(2, 1).into()));

        let images = batch(vec![1, 1, 2, 2], vec![1, 2, 1, 2]);
        let mask = survivors.mask(&images, "images", &keys()).unwrap();
        assert_eq!(mask, BooleanArray::from(vec![true, false, true, false]));
    }

    #[test]
    fn oversized_unsigned_key_is_an_error() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("obs_id", DataType::UInt64, false),
            Field::new("event_id", DataType::UInt64, false),
        ]));
        let b = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt64Array::from(vec![1, 1])),
                Arc::new(UInt64Array::from(vec![7, u64::MAX])),
            ],
        )
        .unwrap();

        let mut builder = SurvivorKeysBuilder::new();
        assert!(matches!(
            builder.extend_from_batch(&b, "params", &keys()),
            Err(CutError::Arrow(_))
        ));
        builder.extend_from_batch(&b.slice(0, 1), "params", &keys()).unwrap();
        assert!(builder.freeze().contains(&(1, 7).into()));
    }

    #[test]
    fn missing_and_invalid_key_columns() {
        let survivors = SurvivorKeysBuilder::new().freeze();
        let schema = Arc::new(Schema::new(vec![
            Field::new("obs_id", DataType::Float32, false),
        ]));
        let b = RecordBatch::try_new(schema, vec![Arc::new(Float32Array::from(vec![1.0]))]).unwrap();

        match survivors.mask(&b, "t", &keys()) {
            Err(CutError::MissingKeyColumns { missing, .. }) => assert_eq!(missing, ["event_id"]),
            other => panic!("expected MissingKeyColumns, got {other:?}"),
        }
        assert!(matches!(
            survivors.mask(&b, "t", &["obs_id".to_string()]),
            Err(CutError::InvalidKeyColumn { .. })
        ));
    }
}
