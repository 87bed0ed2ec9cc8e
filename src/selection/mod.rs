/// Selection layer: cut configuration, compilation, and mask evaluation.
///
/// ```text
///   SelectionConfig  (ordered groups, or legacy column → [op, value] map)
///        │
///        ▼
///   ┌──────────┐
///   │ compile   │  validate groups, resolve operator aliases
///   └──────────┘
///        │  Vec<CompiledCriterion>
///        ▼
///   ┌──────────┐
///   │  mask     │  AND-fold comparisons over one chunk → BooleanArray
///   └──────────┘
/// ```

pub mod compile;
pub mod mask;
pub mod model;

pub use compile::{compile, query_string, CompiledCriterion};
pub use mask::{evaluate, MaskOutcome};
pub use model::{Literal, OperatorKind, SelectionConfig, SelectionGroup};
