//! Line codec for the persisted event log.
//!
//! # Line format (v1)
//!
//! ```text
//! # things event log v1
//! # fields: type \t data \t event_hash
//! task_created\t{"name":"Buy milk","taskId":"task:…"}\tblake3:…
//! ```
//!
//! - `type` is the snake_case [`EventType`] tag.
//! - `data` is the canonical JSON of the remaining fields (keys sorted,
//!   compact). JSON escapes tabs and newlines, so a line always splits into
//!   exactly three fields.
//! - `event_hash` is BLAKE3 over `{type}\t{data}\n`, catching bit rot and
//!   hand edits.
//!
//! # Legacy JSON array
//!
//! Input whose first non-whitespace byte is `[` is read as a JSON array of
//! internally tagged events, the shape earlier releases stored.
//! [`encode_json_array`] writes the same shape for export.
//!
//! Decoding never skips a line it cannot read: the first failure aborts with
//! the 1-based line number.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::canonical::canonicalize_json;
use super::{Event, EventType};
use crate::error::ErrorCode;

/// Header line written at the top of every encoded log.
pub const LOG_HEADER: &str = "# things event log v1";

/// Field-description comment that follows the header.
pub const FIELD_COMMENT: &str = "# fields: type \\t data \\t event_hash";

/// The newest log format version this build can read.
pub const CURRENT_VERSION: u32 = 1;

const HEADER_PREFIX: &str = "# things event log v";
const FIELD_COUNT: usize = 3;

/// On-disk encoding selected for saves. Decoding detects the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Lines,
    Json,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding events.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The serialized payload contained a literal newline.
    #[error("JSON payload contains literal newline: one-line invariant violated")]
    NewlineInPayload,

    /// The event did not serialize to a JSON object.
    #[error("event payload is not a JSON object")]
    NotAnObject,

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a single line (or the whole input) could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount { found: usize, expected: usize },

    #[error("unknown event type: '{0}'")]
    InvalidEventType(String),

    #[error("invalid data JSON: {0}")]
    InvalidDataJson(String),

    #[error("data schema mismatch for {event_type}: {details}")]
    DataSchemaMismatch { event_type: String, details: String },

    #[error("invalid event_hash format: '{0}'")]
    InvalidEventHash(String),

    #[error("event_hash mismatch: line has '{expected}', computed '{computed}'")]
    HashMismatch { expected: String, computed: String },

    /// The log was written by a newer version, or its header is malformed.
    #[error("event log version mismatch: {0}")]
    VersionMismatch(String),

    #[error("event log is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid JSON event array: {0}")]
    InvalidJsonArray(String),
}

/// A decode failure, located at a 1-based line of the input.
///
/// `line` is `None` when the failure concerns the input as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub line: Option<usize>,
    pub kind: ParseError,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl DecodeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self.kind {
            ParseError::VersionMismatch(_) => ErrorCode::UnsupportedLogVersion,
            _ => ErrorCode::CorruptLog,
        }
    }

    const fn at(line: usize, kind: ParseError) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }

    const fn whole(kind: ParseError) -> Self {
        Self { line: None, kind }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Return the header block (header + field comment), newline-terminated.
#[must_use]
pub fn log_header() -> String {
    format!("{LOG_HEADER}\n{FIELD_COMMENT}\n")
}

/// BLAKE3 hash over `{type}\t{data}\n`, in `blake3:<hex>` form.
#[must_use]
pub fn event_hash(event_type: EventType, data_json: &str) -> String {
    let input = format!("{event_type}\t{data_json}\n");
    format!("blake3:{}", blake3::hash(input.as_bytes()).to_hex())
}

/// Serialize one event to a line (without trailing newline).
///
/// # Errors
///
/// Returns [`EncodeError`] if the payload fails to serialize or breaks the
/// one-line invariant.
pub fn encode_line(event: &Event) -> Result<String, EncodeError> {
    let data_json = canonical_data_json(event)?;
    if data_json.contains('\n') {
        return Err(EncodeError::NewlineInPayload);
    }
    let event_type = event.event_type();
    let hash = event_hash(event_type, &data_json);
    Ok(format!("{event_type}\t{data_json}\t{hash}"))
}

/// Encode a full event sequence in the line format, header included.
///
/// # Errors
///
/// Same as [`encode_line`].
pub fn encode_lines(events: &[Event]) -> Result<String, EncodeError> {
    let mut out = log_header();
    for event in events {
        out.push_str(&encode_line(event)?);
        out.push('\n');
    }
    Ok(out)
}

/// Encode a full event sequence as a JSON array of tagged events.
///
/// # Errors
///
/// Returns [`EncodeError::Serialize`] if an event fails to serialize.
pub fn encode_json_array(events: &[Event]) -> Result<String, EncodeError> {
    let values = events
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(canonicalize_json(&Value::Array(values)))
}

/// Encode in the requested format.
///
/// # Errors
///
/// Same as [`encode_lines`] / [`encode_json_array`].
pub fn encode(events: &[Event], format: LogFormat) -> Result<Vec<u8>, EncodeError> {
    let text = match format {
        LogFormat::Lines => encode_lines(events)?,
        LogFormat::Json => encode_json_array(events)?,
    };
    Ok(text.into_bytes())
}

fn canonical_data_json(event: &Event) -> Result<String, EncodeError> {
    let Value::Object(mut map) = serde_json::to_value(event)? else {
        return Err(EncodeError::NotAnObject);
    };
    map.remove("type");
    Ok(canonicalize_json(&Value::Object(map)))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// The result of parsing one line of the line format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A comment line, `#` prefix included.
    Comment(String),
    Blank,
    Event(Box<Event>),
}

/// Detect the format version from a header line.
///
/// # Errors
///
/// Returns an actionable message when the header is malformed or names a
/// version newer than [`CURRENT_VERSION`].
pub fn detect_version(header_line: &str) -> Result<u32, String> {
    let line = header_line.trim();
    let Some(version_str) = line.strip_prefix(HEADER_PREFIX) else {
        return Err(format!(
            "invalid event log header: expected '{HEADER_PREFIX}N', got '{line}'"
        ));
    };
    let version: u32 = version_str.parse().map_err(|_| {
        format!("invalid version number '{version_str}' in event log header")
    })?;
    if version > CURRENT_VERSION {
        return Err(format!(
            "event log version {version} is newer than this build supports \
             (up to v{CURRENT_VERSION}); upgrade clean-things to read it"
        ));
    }
    Ok(version)
}

/// Parse and verify a single line.
///
/// # Errors
///
/// Returns the [`ParseError`] describing the first failed check.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');

    if trimmed.starts_with('#') {
        return Ok(ParsedLine::Comment(trimmed.to_string()));
    }
    if trimmed.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let fields: Vec<&str> = trimmed.split('\t').collect();
    let &[type_raw, data_raw, hash_raw] = fields.as_slice() else {
        return Err(ParseError::FieldCount {
            found: fields.len(),
            expected: FIELD_COUNT,
        });
    };

    let event_type: EventType = type_raw
        .parse()
        .map_err(|_| ParseError::InvalidEventType(type_raw.to_string()))?;

    if !is_valid_blake3_hash(hash_raw) {
        return Err(ParseError::InvalidEventHash(hash_raw.to_string()));
    }
    let computed = event_hash(event_type, data_raw);
    if computed != hash_raw {
        return Err(ParseError::HashMismatch {
            expected: hash_raw.to_string(),
            computed,
        });
    }

    let data: Value =
        serde_json::from_str(data_raw).map_err(|e| ParseError::InvalidDataJson(e.to_string()))?;
    let Value::Object(mut map) = data else {
        return Err(ParseError::DataSchemaMismatch {
            event_type: event_type.to_string(),
            details: "data is not a JSON object".into(),
        });
    };
    map.insert("type".into(), Value::String(event_type.as_str().into()));

    let event: Event =
        serde_json::from_value(Value::Object(map)).map_err(|e| ParseError::DataSchemaMismatch {
            event_type: event_type.to_string(),
            details: e.to_string(),
        })?;

    Ok(ParsedLine::Event(Box::new(event)))
}

/// Decode a stored log, detecting the format.
///
/// Empty input, or a header with no events, decodes to an empty sequence.
///
/// # Errors
///
/// Returns a [`DecodeError`] for the first unreadable line; no event is
/// ever skipped.
pub fn decode(bytes: &[u8]) -> Result<Vec<Event>, DecodeError> {
    let text =
        std::str::from_utf8(bytes).map_err(|_| DecodeError::whole(ParseError::InvalidUtf8))?;
    if text.trim_start().starts_with('[') {
        return decode_json_array(text);
    }
    decode_lines(text)
}

/// Decode the line format.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_lines(text: &str) -> Result<Vec<Event>, DecodeError> {
    let mut events = Vec::new();
    let mut seen_content = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if !seen_content && line.starts_with(HEADER_PREFIX) {
            detect_version(line)
                .map_err(|msg| DecodeError::at(line_no, ParseError::VersionMismatch(msg)))?;
        }
        match parse_line(line).map_err(|kind| DecodeError::at(line_no, kind))? {
            ParsedLine::Event(event) => {
                seen_content = true;
                events.push(*event);
            }
            ParsedLine::Comment(_) | ParsedLine::Blank => {}
        }
    }

    Ok(events)
}

/// Decode a JSON array of tagged events.
///
/// # Errors
///
/// See [`decode`]. Element failures report the element's 1-based index as
/// the line.
pub fn decode_json_array(text: &str) -> Result<Vec<Event>, DecodeError> {
    let values: Vec<Value> = serde_json::from_str(text)
        .map_err(|e| DecodeError::whole(ParseError::InvalidJsonArray(e.to_string())))?;

    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let event_type = value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if event_type.parse::<EventType>().is_err() {
                return Err(DecodeError::at(idx + 1, ParseError::InvalidEventType(event_type)));
            }
            serde_json::from_value(value).map_err(|e| {
                DecodeError::at(
                    idx + 1,
                    ParseError::DataSchemaMismatch {
                        event_type,
                        details: e.to_string(),
                    },
                )
            })
        })
        .collect()
}

fn is_valid_blake3_hash(s: &str) -> bool {
    s.strip_prefix("blake3:")
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
