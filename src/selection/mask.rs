use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, Scalar, StringArray};
use arrow::compute::kernels::cmp;
use arrow::compute::{and, cast, cast_with_options, prep_null_mask_filter, CastOptions};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use super::compile::CompiledCriterion;
use super::model::{Literal, OperatorKind};
use crate::error::{CutError, Result};

/// Result of evaluating a selection on one chunk.
#[derive(Debug, Clone)]
pub struct MaskOutcome {
    /// `true` for every row passing all criteria. Never contains nulls.
    pub mask: BooleanArray,
    /// Rows removed by each criterion, in criterion order.
    ///
    /// Counts are cumulative: a row already removed by an earlier criterion
    /// is not counted again, so the numbers depend on criterion order.
    pub removed: Vec<usize>,
}

impl MaskOutcome {
    pub fn selected(&self) -> usize {
        self.mask.true_count()
    }
}

/// Evaluate `criteria` against an in-memory chunk of `table`.
///
/// The chunk is not modified; the same chunk and criteria always give the
/// same mask. Null cells never pass a comparison.
pub fn evaluate(batch: &RecordBatch, table: &str, criteria: &[CompiledCriterion]) -> Result<MaskOutcome> {
    let n_rows = batch.num_rows();
    let mut mask = BooleanArray::from(vec![true; n_rows]);
    let mut removed = Vec::with_capacity(criteria.len());

    for criterion in criteria {
        let column = batch
            .column_by_name(&criterion.column)
            .ok_or_else(|| CutError::UnknownColumn {
                column: criterion.column.clone(),
                table: table.to_string(),
            })?;

        let selection = compare(column, criterion)?;
        let before = mask.true_count();
        mask = and(&mask, &selection)?;
        let after = mask.true_count();

        log::debug!("Cut \"{criterion}\" removed {} events", before - after);
        removed.push(before - after);
    }

    Ok(MaskOutcome { mask, removed })
}

/// Element-wise comparison of a column against the criterion's literal.
fn compare(column: &ArrayRef, criterion: &CompiledCriterion) -> Result<BooleanArray> {
    let (lhs, rhs) = coerce(column, criterion)?;
    let rhs = Scalar::new(rhs);

    let result = match criterion.operator {
        OperatorKind::Lt => cmp::lt(&lhs, &rhs)?,
        OperatorKind::Le => cmp::lt_eq(&lhs, &rhs)?,
        OperatorKind::Eq => cmp::eq(&lhs, &rhs)?,
        OperatorKind::Ne => cmp::neq(&lhs, &rhs)?,
        OperatorKind::Gt => cmp::gt(&lhs, &rhs)?,
        OperatorKind::Ge => cmp::gt_eq(&lhs, &rhs)?,
    };

    if result.null_count() > 0 {
        Ok(prep_null_mask_filter(&result))
    } else {
        Ok(result)
    }
}

/// Bring column and literal to a common comparable type.
///
/// * integer literal vs integer/boolean column → `Int64`
/// * any float on either side → `Float64`
/// * string literal vs string column → `Utf8`
fn coerce(column: &ArrayRef, criterion: &CompiledCriterion) -> Result<(ArrayRef, ArrayRef)> {
    let dt = column.data_type();
    let integral = dt.is_integer() || *dt == DataType::Boolean;
    let numeric = dt.is_numeric() || *dt == DataType::Boolean;

    let pair: (ArrayRef, ArrayRef) = match &criterion.value {
        Literal::Int(v) if integral => (
            cast_to_i64(column)?,
            Arc::new(Int64Array::from(vec![*v])),
        ),
        Literal::Int(v) if numeric => (
            cast(column, &DataType::Float64)?,
            Arc::new(Float64Array::from(vec![*v as f64])),
        ),
        Literal::Float(v) if numeric => (
            cast(column, &DataType::Float64)?,
            Arc::new(Float64Array::from(vec![*v])),
        ),
        Literal::Str(s) if is_string(dt) => (
            cast(column, &DataType::Utf8)?,
            Arc::new(StringArray::from(vec![s.as_str()])),
        ),
        other => {
            return Err(CutError::IncompatibleLiteral {
                column: criterion.column.clone(),
                data_type: dt.clone(),
                literal: other.to_string(),
            })
        }
    };
    Ok(pair)
}

fn is_string(dt: &DataType) -> bool {
    match dt {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, value) => is_string(value),
        _ => false,
    }
}

/// Widen an integer column to `Int64`, failing on values that do not fit
/// instead of turning them into nulls.
pub(crate) fn cast_to_i64(column: &ArrayRef) -> Result<ArrayRef> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(column, &DataType::Int64, &options)?)
}
