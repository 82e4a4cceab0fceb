//! Dataset file configuration.
//!
//! Describes where each table lives, which text encodings to try, and how
//! its fields are delimited. Deserialized from the `[dataset]` section of the
//! application config; every field has a default matching the prefectural
//! survey export layout.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::LoadError;
use crate::encoding::TextDecoder;

/// Location and format of the regulation, accident, and definition files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory the table file names are resolved against.
    pub data_dir: PathBuf,
    /// Intersection/signal regulation table.
    pub regulations: TableSource,
    /// Accident event table.
    pub accidents: TableSource,
    /// Optional code-to-label definition table.
    pub definitions: Option<TableSource>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            regulations: TableSource::new("seigzo.csv"),
            accidents: TableSource::new("honhyo.csv"),
            definitions: None,
        }
    }
}

impl DatasetConfig {
    /// Resolves a table's file against [`DatasetConfig::data_dir`].
    #[must_use]
    pub fn path_for(&self, source: &TableSource) -> PathBuf {
        self.data_dir.join(&source.file)
    }
}

/// A single delimited text file.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSource {
    /// File name, relative to the data directory.
    pub file: PathBuf,
    /// Encoding labels tried in order (`"utf-8-sig"`, `"auto"`, or any
    /// WHATWG label such as `"shift_jis"`).
    #[serde(default = "default_encodings")]
    pub encodings: Vec<String>,
    /// Field delimiter. Must be a single ASCII character.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Leading bytes inspected by `"auto"` detection.
    #[serde(default)]
    pub sample_bytes: Option<usize>,
}

fn default_encodings() -> Vec<String> {
    vec!["utf-8-sig".to_owned(), "shift_jis".to_owned()]
}

const fn default_delimiter() -> char {
    ','
}

impl TableSource {
    /// A comma-delimited source with the default encoding chain.
    #[must_use]
    pub fn new(file: impl AsRef<Path>) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            encodings: default_encodings(),
            delimiter: default_delimiter(),
            sample_bytes: None,
        }
    }

    /// Parses the configured encoding labels into decoders.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownEncoding`] for an unrecognised label.
    pub fn decoders(&self) -> Result<Vec<TextDecoder>, LoadError> {
        self.encodings
            .iter()
            .map(|label| {
                let decoder = label
                    .parse::<TextDecoder>()
                    .map_err(|e| LoadError::UnknownEncoding { label: e.0 })?;
                Ok(match (decoder, self.sample_bytes) {
                    (TextDecoder::Auto { .. }, Some(sample_bytes)) => {
                        TextDecoder::Auto { sample_bytes }
                    }
                    (decoder, _) => decoder,
                })
            })
            .collect()
    }

    /// The delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidDelimiter`] for a non-ASCII delimiter.
    pub fn delimiter_byte(&self) -> Result<u8, LoadError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(LoadError::InvalidDelimiter {
                delimiter: self.delimiter,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_survey_layout() {
        let config = DatasetConfig::default();
        assert_eq!(
            config.path_for(&config.regulations),
            Path::new("data/seigzo.csv")
        );
        assert_eq!(config.accidents.encodings, ["utf-8-sig", "shift_jis"]);
        assert!(config.definitions.is_none());
    }

    #[test]
    fn deserializes_partial_toml() {
        let config: DatasetConfig = toml::from_str(
            r#"
            data_dir = "/srv/data"

            [accidents]
            file = "honhyo_2023.csv"
            encodings = ["auto"]
            sample_bytes = 4096
            delimiter = "\t"

            [definitions]
            file = "codes.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, Path::new("/srv/data"));
        assert_eq!(config.regulations.file, Path::new("seigzo.csv"));
        assert_eq!(config.accidents.delimiter_byte().unwrap(), b'\t');
        assert_eq!(
            config.accidents.decoders().unwrap(),
            [TextDecoder::Auto { sample_bytes: 4096 }]
        );
        assert_eq!(
            config.definitions.unwrap().encodings,
            ["utf-8-sig", "shift_jis"]
        );
    }

    #[test]
    fn rejects_unknown_encoding_label() {
        let mut source = TableSource::new("x.csv");
        source.encodings = vec!["utf-8".to_owned(), "martian".to_owned()];
        assert!(matches!(
            source.decoders(),
            Err(LoadError::UnknownEncoding { label }) if label == "martian"
        ));
    }

    #[test]
    fn rejects_non_ascii_delimiter() {
        let mut source = TableSource::new("x.csv");
        source.delimiter = '、';
        assert!(matches!(
            source.delimiter_byte(),
            Err(LoadError::InvalidDelimiter { delimiter: '、' })
        ));
    }
}
