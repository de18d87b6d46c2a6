//! Best-effort conversion of extraction job output into display tables.
//!
//! Extraction results arrive as opaque text: a JSON document, markdown
//! sections, `key: value` lines, a pipe table, or prose. Nothing here ever
//! fails on malformed input; unrecognized text simply has no table.

mod classify;
mod columns;
mod csv;
mod error;
mod export;
mod lines;
mod parse;

pub use classify::is_extraction_response;
pub use columns::{KeyAllocator, format_label, infer_column_type, normalize_key};
pub use csv::{CSV_ERROR_PREFIX, CsvOptions, cell_value, is_csv_error, table_to_csv, try_table_to_csv};
pub use error::ExportError;
pub use export::{DEFAULT_CSV_FILENAME, ExportedFile, save_csv};
pub use lines::prepare_text;
pub use parse::{ExtractionFormat, parse_extraction_data, parse_with_format};

/// Shown by callers when an extraction result has no table.
pub const EMPTY_STATE_MESSAGE: &str = "No structured data could be extracted from this result.";
