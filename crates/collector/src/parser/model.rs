use thiserror::Error;

/// Why a line was rejected by the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("empty message")]
    Empty,

    #[error("expected '<' to open the priority")]
    MissingPriority,

    #[error("expected decimal digits inside the priority")]
    InvalidPriority,

    #[error("expected '>' to close the priority")]
    UnterminatedPriority,

    #[error("priority does not fit in 32 bits")]
    PriorityOutOfRange,

    #[error("expected an alphabetic field name")]
    ExpectedKey,

    #[error("expected '=' after field name")]
    ExpectedEquals,

    #[error("expected a quoted string or alphanumeric value")]
    ExpectedValue,

    #[error("unterminated quoted value")]
    UnterminatedQuote,

    #[error("expected whitespace or end of line after value")]
    ExpectedWhitespace,

    #[error("field `{0}` appears more than once")]
    DuplicateKey(String),
}

/// Decode failure with the unparsed suffix of the line at the failure point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}: {remainder:?}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    /// Byte offset into the raw line.
    pub offset: usize,
    pub remainder: String,
}

impl DecodeError {
    pub(crate) fn at(line: &str, offset: usize, kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            offset,
            remainder: line.get(offset..).unwrap_or_default().to_string(),
        }
    }
}

/// Decoded `name=value` pairs in encounter order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends without a uniqueness check; the decoder rejects repeats first.
    pub(crate) fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }
}

/// One decoded appliance message.
///
/// Built once by [`decode`](super::decode) and never mutated afterwards.
/// A record either carries its fields or a [`DecodeError`], never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    raw: String,
    priority: Option<u32>,
    fields: Fields,
    decode_error: Option<DecodeError>,
}

impl Record {
    pub(crate) fn decoded(raw: &str, priority: u32, fields: Fields) -> Self {
        Self {
            raw: raw.to_string(),
            priority: Some(priority),
            fields,
            decode_error: None,
        }
    }

    pub(crate) fn errored(raw: &str, priority: Option<u32>, error: DecodeError) -> Self {
        Self {
            raw: raw.to_string(),
            priority,
            fields: Fields::default(),
            decode_error: Some(error),
        }
    }

    /// The line exactly as it was handed to the decoder.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `None` only when decoding failed before the priority was read.
    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.decode_error.as_ref()
    }

    pub fn is_errored(&self) -> bool {
        self.decode_error.is_some()
    }

    pub fn facility(&self) -> Option<&'static str> {
        self.priority.and_then(super::priority::facility)
    }

    pub fn severity(&self) -> Option<&'static str> {
        self.priority.and_then(super::priority::severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_preserve_insertion_order() {
        let mut fields = Fields::default();
        fields.push("b".into(), "2".into());
        fields.push("a".into(), "1".into());
        let names: Vec<&str> = fields.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_fields_lookup_is_case_sensitive() {
        let mut fields = Fields::default();
        fields.push("Level".into(), "x".into());
        fields.push("level".into(), "y".into());
        assert_eq!(fields.get("level"), Some("y"));
        assert_eq!(fields.get("Level"), Some("x"));
        assert!(!fields.contains("LEVEL"));
    }

    #[test]
    fn test_decode_error_captures_remainder() {
        let err = DecodeError::at("<1>a=b c", 6, DecodeErrorKind::ExpectedEquals);
        assert_eq!(err.remainder, " c");
        assert!(err.to_string().contains("offset 6"));
    }

    #[test]
    fn test_decode_error_offset_past_end_is_empty_remainder() {
        let err = DecodeError::at("<1>", 10, DecodeErrorKind::ExpectedKey);
        assert!(err.remainder.is_empty());
    }
}
