//! Split decoded fields into the fixed columns and the overflow text.

use serde::{Deserialize, Serialize};

use super::schema::{is_known, DIRECT_FIELDS, KNOWN_FIELDS};
use crate::parser::{Fields, Record};

const OVERFLOW_DELIMITER: &str = ", ";

/// What to do with a decoded record that lacks one of the known fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Write `""` for each absent field and keep the row.
    #[default]
    SubstituteEmpty,
    /// Store the record as an errored row naming the absent fields.
    Reject,
}

/// Result of [`partition`]: known values in [`KNOWN_FIELDS`] order plus the
/// remaining pairs in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    pub known: [Option<&'a str>; KNOWN_FIELDS.len()],
    pub overflow: Vec<(&'a str, &'a str)>,
}

impl Partition<'_> {
    pub fn missing(&self) -> Vec<&'static str> {
        KNOWN_FIELDS
            .iter()
            .zip(self.known.iter())
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

pub fn partition(fields: &Fields) -> Partition<'_> {
    let mut known = [None; KNOWN_FIELDS.len()];
    for (slot, name) in known.iter_mut().zip(KNOWN_FIELDS.iter()) {
        *slot = fields.get(name);
    }

    let overflow = fields.iter().filter(|(name, _)| !is_known(name)).collect();

    Partition { known, overflow }
}

/// `{name: value, ...}` with quote characters removed from values.
pub fn render_overflow(pairs: &[(&str, &str)]) -> String {
    let body: Vec<String> = pairs
        .iter()
        .map(|(name, value)| format!("{}: {}", name, strip_quotes(value)))
        .collect();
    format!("{{{}}}", body.join(OVERFLOW_DELIMITER))
}

/// Overflow text for a row that could not be decoded. Kept verbatim.
pub fn render_diagnostic(diagnostic: &str, raw: &str) -> String {
    format!("{{err: {}{}raw: {}}}", diagnostic, OVERFLOW_DELIMITER, raw)
}

fn strip_quotes(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// How a row relates to the record it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Decoded,
    /// Decoded, but these known fields were absent and written as `""`.
    Substituted(Vec<&'static str>),
    /// Undecodable or rejected; the diagnostic lives in the overflow column.
    Errored(String),
}

/// The values bound for one insert, excluding the surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// One value per [`DIRECT_FIELDS`] entry; `None` is stored as NULL.
    pub columns: [Option<String>; DIRECT_FIELDS.len()],
    pub overflow: String,
    pub kind: RowKind,
}

impl StoredRow {
    pub fn from_record(record: &Record, policy: MissingFieldPolicy) -> Self {
        if let Some(err) = record.decode_error() {
            return Self::errored(err.to_string(), record.raw());
        }

        let parts = partition(record.fields());
        let missing = parts.missing();
        if !missing.is_empty() && policy == MissingFieldPolicy::Reject {
            let diagnostic = format!("missing known fields: {}", missing.join(", "));
            return Self::errored(diagnostic, record.raw());
        }

        // DIRECT_FIELDS is the leading run of KNOWN_FIELDS.
        let mut columns: [Option<String>; DIRECT_FIELDS.len()] = Default::default();
        for (column, value) in columns.iter_mut().zip(parts.known.iter()) {
            *column = Some(value.unwrap_or_default().to_string());
        }

        let kind = if missing.is_empty() {
            RowKind::Decoded
        } else {
            RowKind::Substituted(missing)
        };

        Self {
            columns,
            overflow: render_overflow(&parts.overflow),
            kind,
        }
    }

    fn errored(diagnostic: String, raw: &str) -> Self {
        Self {
            columns: Default::default(),
            overflow: render_diagnostic(&diagnostic, raw),
            kind: RowKind::Errored(diagnostic),
        }
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.kind, RowKind::Errored(_))
    }
}
