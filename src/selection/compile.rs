use std::fmt;

use serde_json::Value as JsonValue;

use super::model::{Literal, OperatorKind, SelectionConfig};
use crate::error::{CutError, Result};

/// A validated cut, ready to be evaluated against a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCriterion {
    pub column: String,
    pub operator: OperatorKind,
    pub value: Literal,
}

impl fmt::Display for CompiledCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// Compile a selection into an ordered list of criteria.
///
/// Fails on the first group that does not hold exactly one
/// `column: [operator, value]` entry, or whose operator is unknown.
/// Order is preserved; it only matters for the removed-count diagnostics
/// since criteria are AND-combined.
pub fn compile(config: &SelectionConfig) -> Result<Vec<CompiledCriterion>> {
    config
        .groups()
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let malformed = || CutError::MalformedSelectionEntry {
                index,
                columns: group.entries().iter().map(|(c, _)| c.clone()).collect(),
            };

            let [(column, raw)] = group.entries() else {
                return Err(malformed());
            };
            let Some([operator, value]) = raw.as_array().map(Vec::as_slice) else {
                return Err(malformed());
            };
            let operator = match operator {
                JsonValue::String(token) => OperatorKind::from_token(token).ok_or_else(|| {
                    CutError::UnknownOperator {
                        column: column.clone(),
                        operator: token.clone(),
                    }
                })?,
                other => {
                    return Err(CutError::UnknownOperator {
                        column: column.clone(),
                        operator: other.to_string(),
                    })
                }
            };
            let value = Literal::from_json(value).ok_or_else(malformed)?;

            Ok(CompiledCriterion {
                column: column.clone(),
                operator,
                value,
            })
        })
        .collect()
}

/// Render compiled criteria as one conjunctive query, e.g.
/// `(width > 0) & (name == "gamma")`.
pub fn query_string(criteria: &[CompiledCriterion]) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = criteria.iter().map(|c| c.to_string()).collect();
    format!("({})", parts.join(") & ("))
}
