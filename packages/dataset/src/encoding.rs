//! Ordered text-decoder candidates for dataset files.
//!
//! Survey exports arrive as UTF-8 (with or without a BOM) or as legacy
//! Japanese encodings. Each file is configured with a list of
//! [`TextDecoder`]s; [`decode_with_fallback`] tries them in order with
//! strict decoding and the first one that produces clean text wins.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::{DecoderResult, EUC_JP, Encoding, SHIFT_JIS, UTF_8};

/// Number of leading bytes inspected by [`TextDecoder::Auto`].
pub const DEFAULT_SAMPLE_BYTES: usize = 10_000;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings tried by auto-detection once no BOM is found.
fn detection_order() -> [&'static Encoding; 3] {
    [UTF_8, SHIFT_JIS, EUC_JP]
}

/// Returned when an encoding label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown text encoding label '{0}'")]
pub struct UnknownEncodingError(pub String);

/// One candidate in a file's decoding chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoder {
    /// UTF-8 with an optional leading byte-order mark.
    Utf8Sig,
    /// Sniff the encoding from a leading sample, then decode strictly.
    Auto {
        /// How many leading bytes to inspect.
        sample_bytes: usize,
    },
    /// A fixed WHATWG encoding.
    Labeled(&'static Encoding),
}

impl TextDecoder {
    /// Strictly decodes `bytes`, returning the text and the encoding that
    /// was actually used. Any malformed sequence yields `None`.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> Option<(String, &'static Encoding)> {
        match *self {
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                decode_strict(UTF_8, body).map(|text| (text, UTF_8))
            }
            Self::Labeled(encoding) => {
                decode_strict(encoding, strip_matching_bom(encoding, bytes))
                    .map(|text| (text, encoding))
            }
            Self::Auto { sample_bytes } => {
                let sample = &bytes[..bytes.len().min(sample_bytes)];
                if let Some((encoding, bom_len)) = Encoding::for_bom(sample) {
                    return decode_strict(encoding, &bytes[bom_len..]).map(|text| (text, encoding));
                }

                let guess = detect(sample);
                if let Some(encoding) = guess {
                    log::debug!("Detected {} from leading sample", encoding.name());
                }

                // The sample can be plain ASCII while later bytes are not, so
                // the remaining candidates still get a full decode.
                guess
                    .into_iter()
                    .chain(detection_order().into_iter().filter(|e| Some(*e) != guess))
                    .find_map(|encoding| {
                        let text = decode_strict(encoding, bytes);
                        if text.is_none() {
                            log::debug!("Full decode as {} failed", encoding.name());
                        }
                        text.map(|text| (text, encoding))
                    })
            }
        }
    }
}

impl FromStr for TextDecoder {
    type Err = UnknownEncodingError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8-sig" | "utf_8_sig" | "utf8-sig" => Ok(Self::Utf8Sig),
            "auto" => Ok(Self::Auto {
                sample_bytes: DEFAULT_SAMPLE_BYTES,
            }),
            other => Encoding::for_label(other.as_bytes())
                .map(Self::Labeled)
                .ok_or_else(|| UnknownEncodingError(label.to_owned())),
        }
    }
}

impl fmt::Display for TextDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8Sig => f.write_str("utf-8-sig"),
            Self::Auto { .. } => f.write_str("auto"),
            Self::Labeled(encoding) => f.write_str(encoding.name()),
        }
    }
}

/// Successfully decoded file contents.
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// The decoded text.
    pub text: String,
    /// The encoding that produced it.
    pub encoding: &'static Encoding,
}

/// Tries each decoder in order and returns the first clean decode.
///
/// # Errors
///
/// Returns the display names of every candidate tried if none succeeded.
pub fn decode_with_fallback(
    bytes: &[u8],
    candidates: &[TextDecoder],
) -> Result<DecodedText, Vec<String>> {
    let mut tried = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if let Some((text, encoding)) = candidate.decode(bytes) {
            return Ok(DecodedText { text, encoding });
        }
        log::debug!("Decoding as {candidate} failed, trying next candidate");
        tried.push(candidate.to_string());
    }

    Err(tried)
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

/// Drops a leading BOM only when it announces the expected encoding.
fn strip_matching_bom<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> &'a [u8] {
    match Encoding::for_bom(bytes) {
        Some((bom_encoding, len)) if bom_encoding == encoding => &bytes[len..],
        _ => bytes,
    }
}

/// First encoding in [`detection_order`] that reads a BOM-less sample
/// without errors.
fn detect(sample: &[u8]) -> Option<&'static Encoding> {
    detection_order()
        .into_iter()
        .find(|encoding| decodes_cleanly(*encoding, sample))
}

/// Checks a sample for malformed sequences. A character cut off at the end
/// of the sample is not counted as malformed.
fn decodes_cleanly(encoding: &'static Encoding, sample: &[u8]) -> bool {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let Some(capacity) = decoder.max_utf8_buffer_length_without_replacement(sample.len()) else {
        return false;
    };
    let mut out = String::with_capacity(capacity);
    let (result, _read) = decoder.decode_to_string_without_replacement(sample, &mut out, false);
    matches!(result, DecoderResult::InputEmpty)
}
