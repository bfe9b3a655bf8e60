//! Credential extraction from the request query string.

use url::form_urlencoded;

use super::error::RequestError;

/// Signature inputs sent by the platform on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
    /// Challenge to echo back; only sent on the handshake
    pub echostr: Option<String>,
}

/// Parse and validate credentials from a raw query string.
///
/// Parameters are checked in the order `signature`, `timestamp`, `nonce`,
/// then `echostr` when `require_echostr` is set. An empty value counts as
/// missing. When a key repeats, the first value wins.
pub fn parse_credentials(
    raw_query: Option<&str>,
    require_echostr: bool,
) -> Result<Credentials, RequestError> {
    let raw = raw_query.unwrap_or("");
    validate_query(raw)?;

    let mut signature = None;
    let mut timestamp = None;
    let mut nonce = None;
    let mut echostr = None;

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let slot = match key.as_ref() {
            "signature" => &mut signature,
            "timestamp" => &mut timestamp,
            "nonce" => &mut nonce,
            "echostr" => &mut echostr,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let required = |value: Option<String>, name: &'static str| {
        value
            .filter(|v| !v.is_empty())
            .ok_or(RequestError::MissingParameter(name))
    };

    let signature = required(signature, "signature")?;
    let timestamp = required(timestamp, "timestamp")?;
    let nonce = required(nonce, "nonce")?;
    let echostr = if require_echostr {
        Some(required(echostr, "echostr")?)
    } else {
        None
    };

    Ok(Credentials {
        signature,
        timestamp,
        nonce,
        echostr,
    })
}

/// Reject query strings a strict parser would refuse: bad percent escapes
/// and `;` separators.
fn validate_query(raw: &str) -> Result<(), RequestError> {
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                match escape {
                    Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                    _ => {
                        let end = (i + 3).min(bytes.len());
                        return Err(RequestError::QueryParse(format!(
                            "invalid URL escape {:?}",
                            String::from_utf8_lossy(&bytes[i..end])
                        )));
                    }
                }
            }
            b';' => {
                return Err(RequestError::QueryParse(
                    "invalid semicolon separator in query".to_string(),
                ))
            }
            _ => i += 1,
        }
    }

    Ok(())
}
