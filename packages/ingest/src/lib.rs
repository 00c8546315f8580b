#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident file ingestion and cleaning.
//!
//! Parses an ordered sequence of UTF-16 LE, tab-delimited incident files
//! into one unified [`Incident`] set. The file's position in the sequence
//! (1-based) becomes each row's period index. Exact-duplicate rows are
//! removed and rows whose coordinates or dates fail coercion are dropped;
//! structural problems (missing columns, undecodable bytes) are fatal.

pub mod parsing;

use std::collections::HashSet;
use std::path::Path;

use hotspot_map_models::Incident;
use thiserror::Error;

use parsing::{decode_utf16_le, parse_day_first_date, parse_decimal_comma};

/// Required date column in the source files.
pub const COL_DATE: &str = "DATAOCORRENCIA";
/// Required time column in the source files.
pub const COL_TIME: &str = "HORAOCORRENCIA";
/// Required latitude column in the source files.
pub const COL_LATITUDE: &str = "LATITUDE";
/// Required longitude column in the source files.
pub const COL_LONGITUDE: &str = "LONGITUDE";
/// Optional neighborhood column, consumed only by auto-seeded clustering.
pub const COL_NEIGHBORHOOD: &str = "BAIRRO";
/// Optional city column, consumed only by auto-seeded clustering.
pub const COL_CITY: &str = "CIDADE";

/// Errors that can occur during ingestion.
///
/// All variants are fatal: a file that cannot be structurally parsed
/// aborts the run with no partial ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading a source file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the offending file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file was not valid UTF-16 LE.
    #[error("File {path} is not valid UTF-16 LE")]
    InvalidEncoding {
        /// Path of the offending file.
        path: String,
    },

    /// A required column was missing from the header row.
    #[error("Missing required column {column} in {path}")]
    MissingColumn {
        /// Name of the missing column.
        column: &'static str,
        /// Path of the offending file.
        path: String,
    },

    /// The delimited text itself was malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One raw row as read from a source file, before coercion.
///
/// All fields are kept verbatim so that exact-duplicate removal sees the
/// data the way the file carried it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RawRow {
    date: String,
    time: String,
    neighborhood: Option<String>,
    city: Option<String>,
    latitude: String,
    longitude: String,
    period: u32,
}

/// Header column positions for one source file.
struct ColumnMap {
    date: usize,
    time: usize,
    latitude: usize,
    longitude: usize,
    neighborhood: Option<usize>,
    city: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, path: &str) -> Result<Self, IngestError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(IngestError::MissingColumn {
                    column,
                    path: path.to_string(),
                })
        };

        Ok(Self {
            date: find(COL_DATE)?,
            time: find(COL_TIME)?,
            latitude: find(COL_LATITUDE)?,
            longitude: find(COL_LONGITUDE)?,
            neighborhood: headers.iter().position(|h| h.trim() == COL_NEIGHBORHOOD),
            city: headers.iter().position(|h| h.trim() == COL_CITY),
        })
    }
}

/// Parses and cleans the given files into one unified incident set.
///
/// Files are processed in order; the 1-based position becomes each row's
/// period index. After concatenation, exact-duplicate rows are removed and
/// coordinates are coerced to numeric, dropping rows that fail. An empty
/// result is returned as-is (with a warning) so the caller can decide how
/// to surface it.
///
/// # Errors
///
/// Returns an error if any file cannot be read, decoded, or is missing a
/// required column.
pub fn ingest<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Incident>, IngestError> {
    let mut raw = Vec::new();

    for (idx, path) in paths.iter().enumerate() {
        let period = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let rows = load_file(path.as_ref(), period)?;
        log::info!(
            "Loaded {} rows from {} (period {period})",
            rows.len(),
            path.as_ref().display()
        );
        raw.extend(rows);
    }

    let incidents = clean(raw);

    if incidents.is_empty() {
        log::warn!("Cleaned incident set is empty; clustering will not be possible");
    }

    Ok(incidents)
}

/// Reads one file and parses its rows, tagging them with `period`.
fn load_file(path: &Path, period: u32) -> Result<Vec<RawRow>, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let text = decode_utf16_le(&bytes).ok_or_else(|| IngestError::InvalidEncoding {
        path: path.display().to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?, &path.display().to_string())?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        rows.push(RawRow {
            date: field(columns.date),
            time: field(columns.time),
            neighborhood: columns.neighborhood.map(field),
            city: columns.city.map(field),
            latitude: field(columns.latitude),
            longitude: field(columns.longitude),
            period,
        });
    }

    Ok(rows)
}

/// Removes exact duplicates and coerces rows into typed incidents.
///
/// Rows whose latitude, longitude, or date fail coercion are silently
/// dropped. This is a deliberate robustness-over-completeness policy:
/// source files routinely carry free-text placeholders in the coordinate
/// columns.
fn clean(raw: Vec<RawRow>) -> Vec<Incident> {
    let total = raw.len();

    let mut seen = HashSet::new();
    let mut incidents = Vec::new();
    let mut dropped = 0usize;

    for row in raw {
        if !seen.insert(row.clone()) {
            continue;
        }

        let Some(latitude) = parse_decimal_comma(&row.latitude) else {
            dropped += 1;
            continue;
        };
        let Some(longitude) = parse_decimal_comma(&row.longitude) else {
            dropped += 1;
            continue;
        };
        let Some(date) = parse_day_first_date(&row.date) else {
            dropped += 1;
            continue;
        };

        incidents.push(Incident {
            latitude,
            longitude,
            date,
            time: row.time,
            city: row.city,
            neighborhood: row.neighborhood,
            period: row.period,
        });
    }

    let duplicates = total - incidents.len() - dropped;
    log::info!(
        "Cleaned {total} raw rows into {} incidents ({duplicates} duplicates, {dropped} uncoercible)",
        incidents.len()
    );

    incidents
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const HEADER: &str = "DATAOCORRENCIA\tHORAOCORRENCIA\tBAIRRO\tCIDADE\tLATITUDE\tLONGITUDE";

    /// Writes `text` as UTF-16 LE (with BOM) to a temp file.
    fn write_utf16le(text: &str) -> tempfile::NamedTempFile {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn rows(lines: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    #[test]
    fn parses_a_basic_file() {
        let file = write_utf16le(&rows(&[
            "01/03/2024\t22:30\tCentro\tSao Paulo\t-23,55\t-46,63",
            "02/03/2024\t10:00\tLapa\tSao Paulo\t-23,52\t-46,70",
        ]));

        let incidents = ingest(&[file.path()]).unwrap();

        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].period, 1);
        assert!((incidents[0].latitude - -23.55).abs() < 1e-9);
        assert_eq!(incidents[0].time, "22:30");
        assert_eq!(incidents[0].city.as_deref(), Some("Sao Paulo"));
    }

    #[test]
    fn file_order_determines_period() {
        let first = write_utf16le(&rows(&["01/01/2024\t08:00\tA\tX\t-23,5\t-46,6"]));
        let second = write_utf16le(&rows(&["01/02/2024\t09:00\tB\tY\t-23,6\t-46,7"]));

        let incidents = ingest(&[first.path(), second.path()]).unwrap();

        assert_eq!(incidents[0].period, 1);
        assert_eq!(incidents[1].period, 2);
    }

    #[test]
    fn drops_rows_with_non_numeric_coordinates() {
        // Scenario: 10 rows, 2 with a non-numeric longitude.
        let lines: Vec<String> = (0..10)
            .map(|i| {
                let longitude = if i < 2 { "n/a".to_string() } else { format!("-46,{i}") };
                format!("0{}/03/2024\t12:00\tCentro\tSP\t-23,5{i}\t{longitude}", (i % 9) + 1)
            })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_utf16le(&rows(&refs));

        let incidents = ingest(&[file.path()]).unwrap();

        assert_eq!(incidents.len(), 8);
    }

    #[test]
    fn removes_exact_duplicate_rows() {
        let file = write_utf16le(&rows(&[
            "01/03/2024\t22:30\tCentro\tSP\t-23,55\t-46,63",
            "01/03/2024\t22:30\tCentro\tSP\t-23,55\t-46,63",
            "01/03/2024\t22:30\tCentro\tSP\t-23,55\t-46,64",
        ]));

        let incidents = ingest(&[file.path()]).unwrap();

        assert_eq!(incidents.len(), 2);
    }

    #[test]
    fn identical_rows_in_different_periods_are_kept() {
        let line = "01/03/2024\t22:30\tCentro\tSP\t-23,55\t-46,63";
        let first = write_utf16le(&rows(&[line]));
        let second = write_utf16le(&rows(&[line]));

        let incidents = ingest(&[first.path(), second.path()]).unwrap();

        assert_eq!(incidents.len(), 2);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let mut text = "DATAOCORRENCIA\tHORAOCORRENCIA\tLATITUDE".to_string();
        text.push_str("\n01/03/2024\t22:30\t-23,55");
        let file = write_utf16le(&text);

        let err = ingest(&[file.path()]).unwrap_err();

        assert!(matches!(
            err,
            IngestError::MissingColumn {
                column: COL_LONGITUDE,
                ..
            }
        ));
    }

    #[test]
    fn area_columns_are_optional() {
        let text = "DATAOCORRENCIA\tHORAOCORRENCIA\tLATITUDE\tLONGITUDE\n\
                    01/03/2024\t22:30\t-23,55\t-46,63";
        let file = write_utf16le(text);

        let incidents = ingest(&[file.path()]).unwrap();

        assert_eq!(incidents.len(), 1);
        assert!(incidents[0].city.is_none());
        assert!(incidents[0].neighborhood.is_none());
    }

    #[test]
    fn invalid_utf16_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Odd byte count cannot be UTF-16.
        file.write_all(&[0xFF, 0xFE, 0x41]).unwrap();
        file.flush().unwrap();

        let err = ingest(&[file.path()]).unwrap_err();

        assert!(matches!(err, IngestError::InvalidEncoding { .. }));
    }

    #[test]
    fn empty_cleaned_set_is_returned_not_raised() {
        let file = write_utf16le(&rows(&["01/03/2024\t22:30\tCentro\tSP\tn/a\tn/a"]));

        let incidents = ingest(&[file.path()]).unwrap();

        assert!(incidents.is_empty());
    }
}
