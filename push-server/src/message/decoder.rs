//! Streaming XML decoder for push envelopes.
//!
//! Only the direct children of the root element are read; nested blocks the
//! platform adds for some events (`ScanCodeInfo`, `SendPicsInfo`, ...) are
//! skipped along with any element this crate does not model.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use super::envelope::{Envelope, Field, Slot};

/// Failure to decode an envelope body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed xml: {0}")]
    Malformed(String),

    #[error("document has no root element")]
    Empty,

    #[error("document ended inside an open element")]
    UnexpectedEof,

    #[error("invalid value for <{field}>: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Decode `body` into `out`, reusing the target's string buffers.
///
/// `out` is reset first, so fields missing from the document are always
/// empty/zero afterwards. Field combinations are not validated here.
pub fn decode_envelope(body: &[u8], out: &mut Envelope) -> Result<(), DecodeError> {
    out.reset();

    let mut reader = Reader::from_reader(body);
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut current: Option<Field> = None;
    // Text of the numeric element being read; string elements are written
    // straight into the envelope.
    let mut numeric = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    seen_root = true;
                } else if depth == 2 {
                    current = Field::from_tag(e.name().as_ref());
                    if let Some(field) = current {
                        begin(out, field, &mut numeric);
                    }
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    seen_root = true;
                    break;
                }
                if depth == 1 {
                    if let Some(field) = Field::from_tag(e.name().as_ref()) {
                        begin(out, field, &mut numeric);
                        finish(out, field, &numeric)?;
                    }
                }
            }
            Event::Text(e) => {
                if depth == 2 {
                    if let Some(field) = current {
                        let text = e
                            .unescape()
                            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                        append(out, field, &mut numeric, &text);
                    }
                }
            }
            Event::CData(e) => {
                if depth == 2 {
                    if let Some(field) = current {
                        let text = std::str::from_utf8(&e)
                            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                        append(out, field, &mut numeric, text);
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(field) = current.take() {
                        finish(out, field, &numeric)?;
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(DecodeError::UnexpectedEof);
                }
                break;
            }
            _ => {}
        }
    }

    if !seen_root {
        return Err(DecodeError::Empty);
    }

    Ok(())
}

fn begin(out: &mut Envelope, field: Field, numeric: &mut String) {
    match out.slot(field) {
        // A repeated element overwrites the earlier value.
        Slot::Text(s) => s.clear(),
        _ => numeric.clear(),
    }
}

fn append(out: &mut Envelope, field: Field, numeric: &mut String, text: &str) {
    match out.slot(field) {
        Slot::Text(s) => s.push_str(text),
        _ => numeric.push_str(text),
    }
}

fn finish(out: &mut Envelope, field: Field, numeric: &str) -> Result<(), DecodeError> {
    let raw = numeric.trim();
    let invalid = || DecodeError::InvalidValue {
        field: field.tag(),
        value: raw.to_string(),
    };

    match out.slot(field) {
        Slot::Text(_) => {}
        Slot::Int64(v) => *v = parse_or_zero(raw).map_err(|_| invalid())?,
        Slot::Int32(v) => *v = parse_or_zero(raw).map_err(|_| invalid())?,
        Slot::Float(v) => *v = parse_or_zero(raw).map_err(|_| invalid())?,
    }

    Ok(())
}

/// Empty numeric elements decode as zero.
fn parse_or_zero<T>(raw: &str) -> Result<T, T::Err>
where
    T: std::str::FromStr + Default,
{
    if raw.is_empty() {
        Ok(T::default())
    } else {
        raw.parse()
    }
}
