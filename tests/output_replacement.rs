//! Output Replacement Tests
//!
//! Tests for the validate-then-replace flow behind the command line:
//! - Configuration and schema errors leave an existing output untouched
//! - An existing output is only replaced when overwriting is requested
//! - An output overlapping the input store is always refused

mod common;

use std::path::Path;

use astro_cuts::store::Store;
use astro_cuts::{run_cascade, run_chunked, CascadeOptions, CopyOptions, CutError, SelectionConfig};
use common::*;

fn previous_output(root: &Path) {
    write_table(root, "previous/run", &events_batch(4), 10);
}

fn assert_untouched(root: &Path) {
    let store = Store::open(root).unwrap();
    let keys: Vec<String> = store.tables().unwrap().into_iter().map(|t| t.key).collect();
    assert_eq!(keys, ["previous/run"]);
    assert_eq!(store.row_count("previous/run").unwrap(), 4);
}

fn cascade_options() -> CascadeOptions {
    CascadeOptions {
        parameters_group: "params".to_string(),
        key_columns: vec!["event_id".to_string()],
        copy: CopyOptions::default(),
    }
}

// =============================================================================
// Errors before the output is cleared
// =============================================================================

/// A cut on a column the table lacks fails before the output is removed.
#[test]
fn test_unknown_column_keeps_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "events", &xy_batch(), 10);
    previous_output(&output);

    let selection = SelectionConfig::new().with("size", ">", 1);
    let err = run_chunked(&input, &output, &selection, "events", &CopyOptions::default(), true).unwrap_err();

    assert!(matches!(err, CutError::UnknownColumn { .. }), "{err:?}");
    assert_untouched(&output);
}

/// A misspelled table key fails before the output is removed.
#[test]
fn test_missing_table_keeps_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "events", &xy_batch(), 10);
    previous_output(&output);

    let selection = SelectionConfig::new().with("x", ">", 1);
    let err = run_chunked(&input, &output, &selection, "evnets", &CopyOptions::default(), true).unwrap_err();

    assert!(matches!(err, CutError::TableNotFound(_)), "{err:?}");
    assert_untouched(&output);
}

/// An unknown operator fails before the output is removed.
#[test]
fn test_unknown_operator_keeps_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "events", &xy_batch(), 10);
    previous_output(&output);

    let selection = SelectionConfig::new().with("x", "~", 1);
    let err = run_chunked(&input, &output, &selection, "events", &CopyOptions::default(), true).unwrap_err();

    assert!(err.is_config_error());
    assert_untouched(&output);
}

/// Parameter tables without the key columns fail before the output is removed.
#[test]
fn test_cascade_missing_keys_keeps_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "params/tel_1", &events_batch(6), 10);
    previous_output(&output);

    let options = CascadeOptions {
        key_columns: vec!["obs_id".to_string(), "event_id".to_string()],
        ..cascade_options()
    };
    let selection = SelectionConfig::new().with("size", ">", 10);
    let err = run_cascade(&input, &output, &selection, &options, true).unwrap_err();

    match err {
        CutError::MissingKeyColumns { missing, .. } => assert_eq!(missing, ["obs_id"]),
        other => panic!("expected MissingKeyColumns, got {other:?}"),
    }
    assert_untouched(&output);
}

// =============================================================================
// Replacing an existing output
// =============================================================================

/// Without overwriting, a non-empty output is refused.
#[test]
fn test_non_empty_output_needs_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "events", &xy_batch(), 10);
    previous_output(&output);

    let selection = SelectionConfig::new().with("x", ">", 1);
    let err = run_chunked(&input, &output, &selection, "events", &CopyOptions::default(), false).unwrap_err();

    assert!(matches!(err, CutError::OutputNotEmpty(_)), "{err:?}");
    assert_untouched(&output);
}

/// Overwriting drops the previous tables and writes the new ones.
#[test]
fn test_overwrite_replaces_output() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = (dir.path().join("in"), dir.path().join("out"));
    write_table(&input, "params/tel_1", &events_batch(6), 10);
    previous_output(&output);

    let selection = SelectionConfig::new().with("event_id", ">=", 3);
    let stats = run_cascade(&input, &output, &selection, &cascade_options(), true).unwrap();
    assert_eq!((stats.rows_before, stats.rows_after), (6, 3));

    let store = Store::open(&output).unwrap();
    assert!(!store.contains("previous/run"));
    assert_eq!(i64_column(&read_table(&output, "params/tel_1"), "event_id"), [3, 4, 5]);
}

// =============================================================================
// Overlapping input and output
// =============================================================================

/// Writing a store onto itself is refused and the input survives.
#[test]
fn test_output_equal_to_input_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("store");
    write_table(&input, "events", &xy_batch(), 10);

    let selection = SelectionConfig::new().with("x", ">", 1);
    let err = run_chunked(&input, &input, &selection, "events", &CopyOptions::default(), true).unwrap_err();
    assert!(matches!(err, CutError::OutputOverlapsInput { .. }), "{err:?}");

    let err = run_cascade(&input, dir.path(), &selection, &cascade_options(), true).unwrap_err();
    assert!(matches!(err, CutError::OutputOverlapsInput { .. }), "{err:?}");

    assert_eq!(i64_column(&read_table(&input, "events"), "x"), [1, 2, 3]);
}
