//! Output tables: `X;Y` semicolon-separated files written beside each plan.
//!
//! Values are plain fixed-point decimals (never exponent notation, always
//! with a fractional part, `123456.0`) using the configured decimal separator. Files
//! are written to `<name>.csv.tmp` first and renamed into place, so a reader
//! polling the output path sees either nothing or the complete table.

use crate::config::DecimalSeparator;
use crate::error::DocumentError;
use crate::pipeline::extract::CoordinatePair;
use std::path::{Path, PathBuf};

/// Field separator of the output table.
pub const FIELD_SEPARATOR: char = ';';

/// Extension of output tables.
pub const TABLE_EXTENSION: &str = "csv";

/// The table path for a source document: same directory, same stem, `.csv`.
pub fn output_path_for(document: &Path) -> PathBuf {
    document.with_extension(TABLE_EXTENSION)
}

/// Render one value with the requested decimal separator.
pub fn format_value(value: f64, decimal: DecimalSeparator) -> String {
    let text = value.to_string();
    let (int, frac) = text.split_once('.').unwrap_or((&text, "0"));
    format!("{int}{}{frac}", decimal.as_char())
}

/// Render the full table, header included.
pub fn format_table(pairs: &[CoordinatePair], decimal: DecimalSeparator) -> String {
    let mut out = String::with_capacity(8 + pairs.len() * 24);
    out.push('X');
    out.push(FIELD_SEPARATOR);
    out.push_str("Y\n");
    for p in pairs {
        out.push_str(&format_value(p.x, decimal));
        out.push(FIELD_SEPARATOR);
        out.push_str(&format_value(p.y, decimal));
        out.push('\n');
    }
    out
}

/// Write `contents` to `path` atomically (temp file + rename).
pub async fn write_table(path: &Path, contents: &str) -> Result<(), DocumentError> {
    let write_err = |source| DocumentError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = path.with_extension(format!("{TABLE_EXTENSION}.tmp"));
    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    Ok(())
}
