#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loader for the accident map.
//!
//! Reads the regulation, accident, and (optionally) definition tables from
//! delimited text files once at startup. Each file is decoded through an
//! ordered chain of [`encoding::TextDecoder`]s and parsed into a
//! [`Table`] whose columns come from the header row. The resulting
//! [`ReferenceTables`] are immutable for the life of the process.

pub mod config;
pub mod encoding;

use std::path::{Path, PathBuf};

use accident_map_dataset_models::Table;

use crate::config::{DatasetConfig, TableSource};
use crate::encoding::{TextDecoder, decode_with_fallback};

/// Errors that abort dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("Dataset file not found: {}", .path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Reading the file failed for a reason other than absence.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Every configured encoding failed to decode the file.
    #[error("Could not decode {} with any of: {}", .path.display(), .tried.join(", "))]
    Undecodable {
        /// File being decoded.
        path: PathBuf,
        /// Encodings tried, in order.
        tried: Vec<String>,
    },

    /// The decoded text is not valid delimited data.
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },

    /// The file is empty or its first line has no fields.
    #[error("{} has no header row", .path.display())]
    MissingHeader {
        /// File being parsed.
        path: PathBuf,
    },

    /// An encoding label in the configuration is not recognised.
    #[error("Unknown text encoding label '{label}'")]
    UnknownEncoding {
        /// The offending label.
        label: String,
    },

    /// The configured delimiter is not a single ASCII character.
    #[error("Delimiter {delimiter:?} must be a single ASCII character")]
    InvalidDelimiter {
        /// The offending delimiter.
        delimiter: char,
    },
}

/// The tables loaded at startup and shared read-only by every request.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    /// Intersection/signal regulation table.
    pub regulations: Table,
    /// Accident event table.
    pub accidents: Table,
    /// Code-to-label definition table, when configured and present.
    pub definitions: Option<Table>,
}

impl ReferenceTables {
    /// Loads every configured table.
    ///
    /// The definition table is optional: a missing file is logged and
    /// skipped, but a file that exists and cannot be decoded is an error.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the regulation or accident table cannot be
    /// read, decoded, or parsed, or if the definition table exists but
    /// cannot be decoded or parsed.
    pub fn load(config: &DatasetConfig) -> Result<Self, LoadError> {
        let regulations = load_table(&config.path_for(&config.regulations), &config.regulations)?;
        let accidents = load_table(&config.path_for(&config.accidents), &config.accidents)?;

        let definitions = match &config.definitions {
            None => None,
            Some(source) => match load_table(&config.path_for(source), source) {
                Ok(table) => Some(table),
                Err(LoadError::NotFound { path }) => {
                    log::warn!(
                        "Definition table {} not found, continuing without it",
                        path.display()
                    );
                    None
                }
                Err(e) => return Err(e),
            },
        };

        Ok(Self {
            regulations,
            accidents,
            definitions,
        })
    }
}

/// Reads, decodes, and parses one delimited text file.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing, unreadable, undecodable
/// with every configured encoding, or not valid delimited text.
pub fn load_table(path: &Path, source: &TableSource) -> Result<Table, LoadError> {
    let decoders = source.decoders()?;
    let delimiter = source.delimiter_byte()?;

    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    log::debug!("Read {} bytes from {}", bytes.len(), path.display());

    let table = parse_table(path, &bytes, &decoders, delimiter)?;

    log::info!(
        "Loaded {} rows ({} columns) from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );

    Ok(table)
}

/// Decodes raw file contents and parses them into a [`Table`].
///
/// `path` is only used in error messages and logs.
///
/// # Errors
///
/// Returns [`LoadError::Undecodable`], [`LoadError::Csv`], or
/// [`LoadError::MissingHeader`].
pub fn parse_table(
    path: &Path,
    bytes: &[u8],
    decoders: &[TextDecoder],
    delimiter: u8,
) -> Result<Table, LoadError> {
    let decoded = decode_with_fallback(bytes, decoders).map_err(|tried| LoadError::Undecodable {
        path: path.to_path_buf(),
        tried,
    })?;

    log::debug!("Decoded {} as {}", path.display(), decoded.encoding.name());

    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(decoded.text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(LoadError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        raw_rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(Table::from_text_rows(headers, &raw_rows))
}
