use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, CutError>;

/// Everything that can go wrong while compiling or applying cuts.
#[derive(Debug, Error)]
pub enum CutError {
    // -- Configuration errors (raised before any output is written) --
    #[error(
        "Malformed selection entry #{index}: expected a single `column: [operator, value]` \
         pair, got [{}]",
        .columns.join(", ")
    )]
    MalformedSelectionEntry { index: usize, columns: Vec<String> },

    #[error("Unknown operator `{operator}` in cut on column `{column}`")]
    UnknownOperator { column: String, operator: String },

    #[error("Invalid chunk size {0}, must be at least 1")]
    InvalidChunkSize(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // -- Schema errors (abort the current table) --
    #[error("Cannot perform selection based on `{column}`: column is missing from table `{table}`")]
    UnknownColumn { column: String, table: String },

    #[error("Cannot compare column `{column}` of type {data_type} with literal {literal}")]
    IncompatibleLiteral {
        column: String,
        data_type: DataType,
        literal: String,
    },

    #[error("Skipping column `{column}` of table `{table}`: rank {rank} is not supported")]
    UnsupportedColumnRank {
        table: String,
        column: String,
        rank: usize,
    },

    #[error("Table `{table}` is missing key columns [{}]", .missing.join(", "))]
    MissingKeyColumns { table: String, missing: Vec<String> },

    #[error("Key column `{column}` of table `{table}` has type {data_type}, expected integers")]
    InvalidKeyColumn {
        table: String,
        column: String,
        data_type: DataType,
    },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Chunk [{start}, {end}) of `{table}` delivered {rows} rows")]
    ChunkMismatch {
        table: String,
        start: u64,
        end: u64,
        rows: usize,
    },

    // -- Output placement --
    #[error("Output {output} overlaps the input store {input}")]
    OutputOverlapsInput { input: String, output: String },

    #[error("Output {0} already exists and is not empty")]
    OutputNotEmpty(String),

    // -- Store I/O --
    #[error("Output table `{0}` is already closed")]
    SinkClosed(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    Parquet(#[from] ParquetError),
}

impl CutError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CutError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Whether the error stems from the selection configuration itself.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CutError::MalformedSelectionEntry { .. }
                | CutError::UnknownOperator { .. }
                | CutError::InvalidChunkSize(_)
                | CutError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = CutError::UnknownOperator {
            column: "width".into(),
            operator: "~".into(),
        };
        assert_eq!(err.to_string(), "Unknown operator `~` in cut on column `width`");

        let err = CutError::MalformedSelectionEntry {
            index: 2,
            columns: vec!["x".into(), "y".into()],
        };
        assert!(err.to_string().contains("[x, y]"));
        assert!(err.is_config_error());

        let err = CutError::UnknownColumn {
            column: "size".into(),
            table: "events".into(),
        };
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("`size`"));

        assert!(!CutError::SinkClosed("events".into()).is_config_error());
    }
}
