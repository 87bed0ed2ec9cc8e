//! Selection cuts for large columnar event datasets.
//!
//! A selection is a list of `column: [operator, value]` cuts. It is compiled
//! once ([`selection::compile`]), evaluated chunk by chunk
//! ([`selection::evaluate`]), and applied either to a single table
//! ([`apply_cuts_chunked`]) or to a whole family of tables linked by an event
//! key ([`apply_cuts_cascade`]). Tables live in a [`store::Store`], a
//! directory tree of Parquet files.

pub mod config;
pub mod cuts;
pub mod error;
pub mod selection;
pub mod store;

pub use cuts::{
    apply_cuts_cascade, apply_cuts_cascade_with, apply_cuts_chunked, apply_cuts_chunked_with,
    check_cascade, check_chunked, run_cascade, run_chunked, CascadeOptions, CopyOptions, CopyStats,
};
pub use error::{CutError, Result};
pub use selection::SelectionConfig;
