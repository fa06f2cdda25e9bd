//! Telemetry header
//!
//! The decoy smuggles each `AttackEvent` back to the relay as JSON in a
//! response header. Header values must be visible ASCII, so the JSON is
//! written with every non-ASCII character escaped as `\uXXXX`; a standard
//! JSON parser reads it back unchanged.

use std::collections::BTreeMap;
use std::io;

use axum::http::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::TelemetryError;
use crate::models::AttackEvent;

pub const TELEMETRY_HEADER: &str = "x-honeypot-data";
pub const SESSION_HEADER: &str = "x-session-id";

/// Largest serialized payload kept in an event
pub const MAX_PAYLOAD_BYTES: usize = 2048;
/// Most headers kept in an event
pub const MAX_HEADERS: usize = 48;
/// Longest header value kept in an event
pub const MAX_HEADER_VALUE_BYTES: usize = 256;
/// Longest header name kept in an event
pub const MAX_HEADER_NAME_BYTES: usize = 64;
/// Largest encoded telemetry header
pub const MAX_TELEMETRY_BYTES: usize = 16 * 1024;
/// Caller-supplied event strings are clipped to this when the budget is blown
const MAX_FIELD_BYTES: usize = 512;

const TRUNCATED: &str = "[truncated]";

// ============================================================================
// ENCODE / DECODE
// ============================================================================

/// Serialize an event into a header value no larger than
/// `MAX_TELEMETRY_BYTES`. An oversized event loses its headers first, then
/// its payload, then has its caller-supplied strings clipped.
pub fn encode(event: &AttackEvent) -> Result<HeaderValue, TelemetryError> {
    let mut out = to_ascii_json(event)?;
    if out.len() > MAX_TELEMETRY_BYTES {
        let mut shrunk = event.clone();

        shrunk.headers.clear();
        out = to_ascii_json(&shrunk)?;

        if out.len() > MAX_TELEMETRY_BYTES {
            shrunk.payload = Some(serde_json::Value::String(TRUNCATED.to_string()));
            out = to_ascii_json(&shrunk)?;
        }

        if out.len() > MAX_TELEMETRY_BYTES {
            for field in [&mut shrunk.session_id, &mut shrunk.user_agent, &mut shrunk.target_url] {
                clip(field, MAX_FIELD_BYTES);
            }
            out = to_ascii_json(&shrunk)?;
        }

        tracing::debug!(
            url = %truncate_utf8(&event.target_url, MAX_FIELD_BYTES),
            encoded = out.len(),
            "Telemetry event shrunk to fit header budget"
        );
    }
    HeaderValue::from_bytes(&out).map_err(|e| TelemetryError::Encode(e.to_string()))
}

fn to_ascii_json(event: &AttackEvent) -> Result<Vec<u8>, TelemetryError> {
    let mut out = Vec::with_capacity(1024);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
    event.serialize(&mut serializer)?;
    Ok(out)
}

pub fn decode(value: &HeaderValue) -> Result<AttackEvent, TelemetryError> {
    let event: AttackEvent = serde_json::from_slice(value.as_bytes())?;
    event.validate()?;
    Ok(event)
}

/// Pull the event out of a decoy response's headers
pub fn extract(headers: &HeaderMap) -> Result<AttackEvent, TelemetryError> {
    let value = headers.get(TELEMETRY_HEADER).ok_or(TelemetryError::Missing)?;
    decode(value)
}

/// JSON formatter that keeps output inside printable ASCII
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

// ============================================================================
// SIZE CAPS
// ============================================================================

/// Keep the payload as-is when small, otherwise replace it with a
/// truncated string form.
pub fn cap_payload(payload: serde_json::Value) -> serde_json::Value {
    let serialized = match &payload {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if serialized.len() <= MAX_PAYLOAD_BYTES {
        return payload;
    }
    let kept = truncate_utf8(&serialized, MAX_PAYLOAD_BYTES - TRUNCATED.len());
    serde_json::Value::String(format!("{}{}", kept, TRUNCATED))
}

/// Flatten a header map for forensics, bounded in count, name length and
/// value length. Repeated headers are joined with ", ".
pub fn cap_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut captured = BTreeMap::new();
    for name in headers.keys() {
        if captured.len() >= MAX_HEADERS {
            break;
        }
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let value = if joined.len() > MAX_HEADER_VALUE_BYTES {
            let kept = truncate_utf8(&joined, MAX_HEADER_VALUE_BYTES - TRUNCATED.len());
            format!("{}{}", kept, TRUNCATED)
        } else {
            joined
        };
        let name = name.as_str();
        let name = if name.len() > MAX_HEADER_NAME_BYTES {
            format!("{}{}", truncate_utf8(name, MAX_HEADER_NAME_BYTES - TRUNCATED.len()), TRUNCATED)
        } else {
            name.to_string()
        };
        captured.insert(name, value);
    }
    captured
}

fn clip(field: &mut String, max: usize) {
    if field.len() > max {
        let kept = truncate_utf8(field, max - TRUNCATED.len()).len();
        field.truncate(kept);
        field.push_str(TRUNCATED);
    }
}

fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
