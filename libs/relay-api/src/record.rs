use crate::error::MalformedReason;

/// Inbound record split into its destination topic and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub topic: String,
    pub body: String,
    /// Number of space-separated tokens after the topic, empty ones included.
    pub reading_count: usize,
}

/// Result of translating one datagram. There is no partial success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Ok(ParsedRecord),
    Malformed(MalformedReason),
}

/// Translate a raw datagram `<topic> <v1> <v2> ...` into a record.
///
/// Tokens are split on the single space character, so `"a  b"` yields
/// the topic `a` and the readings `["", "b"]`.
pub fn translate(raw: &[u8]) -> ParseOutcome {
    let text = match std::str::from_utf8(raw) {
        Ok(t) => t,
        Err(e) => return ParseOutcome::Malformed(MalformedReason::Decode(e)),
    };
    if text.is_empty() {
        return ParseOutcome::Malformed(MalformedReason::Empty);
    }

    let (topic, body) = match text.split_once(' ') {
        Some((topic, body)) => (topic, Some(body)),
        None => (text, None),
    };
    if topic.is_empty() {
        return ParseOutcome::Malformed(MalformedReason::EmptyTopic);
    }

    // Rejoining the tail with single spaces reproduces it verbatim.
    let (body, reading_count) = match body {
        Some(body) => (body.to_string(), body.split(' ').count()),
        None => (String::new(), 0),
    };

    ParseOutcome::Ok(ParsedRecord {
        topic: topic.to_string(),
        body,
        reading_count,
    })
}
