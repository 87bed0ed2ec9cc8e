#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, FixedSizeListArray, Float32Array, Float64Array, Int64Array,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;

use astro_cuts::store::{Compression, Store};

/// Write `batch` as table `key` of the store at `root`, in row groups of
/// `group_rows` rows.
pub fn write_table(root: &Path, key: &str, batch: &RecordBatch, group_rows: usize) {
    let store = Store::create(root).unwrap();
    let props = Compression::None.writer_properties().unwrap();
    let mut sink = store.create_table(key, batch.schema(), props).unwrap();
    let mut offset = 0;
    while offset < batch.num_rows() {
        let len = group_rows.min(batch.num_rows() - offset);
        sink.append(&batch.slice(offset, len)).unwrap();
        offset += len;
    }
    sink.finish().unwrap();
}

/// Read a whole table back into one batch.
pub fn read_table(root: &Path, key: &str) -> RecordBatch {
    let store = Store::open(root).unwrap();
    let schema = store.schema(key).unwrap();
    let batches: Vec<RecordBatch> = store
        .chunk_reader(key, 1024)
        .unwrap()
        .map(|b| b.unwrap())
        .collect();
    concat_batches(&schema, &batches).unwrap()
}

pub fn i64_column(batch: &RecordBatch, name: &str) -> Vec<i64> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_primitive::<Int64Type>()
        .values()
        .to_vec()
}

pub fn f64_column(batch: &RecordBatch, name: &str) -> Vec<f64> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_primitive::<Float64Type>()
        .values()
        .to_vec()
}

pub fn fixed_list(values: Vec<f32>, size: i32) -> ArrayRef {
    let item = Arc::new(Field::new("item", DataType::Float32, false));
    Arc::new(FixedSizeListArray::new(item, size, Arc::new(Float32Array::from(values)), None))
}

/// `x: int64, y: float64` with rows (1, 0.5), (2, 1.5), (3, 2.5).
pub fn xy_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Int64, false),
        Field::new("y", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![0.5, 1.5, 2.5])),
        ],
    )
    .unwrap()
}

/// A larger table mixing scalar and rank-2 columns.
pub fn events_batch(n: i64) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Int64, false),
        Field::new("size", DataType::Float64, false),
        Field::new(
            "pos",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), 2),
            false,
        ),
    ]));
    let ids: Vec<i64> = (0..n).collect();
    let sizes: Vec<f64> = ids.iter().map(|i| ((i * 37) % 101) as f64).collect();
    let pos: Vec<f32> = ids.iter().flat_map(|&i| [i as f32, -(i as f32)]).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Float64Array::from(sizes)),
            fixed_list(pos, 2),
        ],
    )
    .unwrap()
}

pub fn field_names(batch: &RecordBatch) -> Vec<String> {
    batch.schema().fields().iter().map(|f| f.name().clone()).collect()
}

pub fn same_columns(a: &RecordBatch, b: &RecordBatch) -> bool {
    a.num_columns() == b.num_columns()
        && a
            .columns()
            .iter()
            .zip(b.columns())
            .all(|(x, y)| x.to_data() == y.to_data())
}
