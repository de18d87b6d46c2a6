use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Standard alphabet, tolerant of both padded and unpadded segments.
/// URL-safe input is translated to it first.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct RoleClaim {
    #[serde(default)]
    role: Option<Value>,
}

/// Decodes the payload segment of a JWT without verifying it.
///
/// The result is display-only; the backend re-checks the token on every
/// request. Any malformed input yields `None`.
pub fn decode_payload(token: &str) -> Option<Value> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        debug!(segments = segments.len(), "token is not a three-part jwt");
        return None;
    }

    let payload = segments[1].replace('-', "+").replace('_', "/");
    let bytes = STANDARD_LENIENT.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The `role` claim of a token's payload, if it is a string.
pub fn role_claim(token: &str) -> Option<String> {
    let payload = decode_payload(token)?;
    let claim: RoleClaim = serde_json::from_value(payload).ok()?;
    match claim.role? {
        Value::String(role) => Some(role),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn token_with_payload(payload: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload)
    )
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE;

    use super::*;

    #[test]
    fn reads_role_claim() {
        let token = token_with_payload(r#"{"role":"owner","sub":"u1"}"#);
        assert_eq!(role_claim(&token).as_deref(), Some("owner"));
    }

    #[test]
    fn accepts_padded_segments() {
        let token = format!("h.{}.s", URL_SAFE.encode(r#"{"role":"admin"}"#));
        assert_eq!(role_claim(&token).as_deref(), Some("admin"));
    }

    #[test]
    fn decodes_url_safe_characters() {
        let token = token_with_payload(r#"{"role":"member","note":"??>"}"#);
        assert!(token.split('.').nth(1).is_some_and(|p| p.contains('_')));
        assert_eq!(role_claim(&token).as_deref(), Some("member"));
    }

    #[test]
    fn decodes_standard_alphabet_payloads() {
        use base64::engine::general_purpose::STANDARD_NO_PAD;

        let encoded = STANDARD_NO_PAD.encode(r#"{"role":"member","note":"??>"}"#);
        assert!(encoded.contains('/'));
        let token = format!("h.{encoded}.s");
        assert_eq!(role_claim(&token).as_deref(), Some("member"));
    }

    #[test]
    fn malformed_tokens_yield_nothing() {
        assert_eq!(role_claim("not-a-jwt"), None);
        assert_eq!(role_claim("a.b"), None);
        assert_eq!(role_claim("a.b.c.d"), None);
        assert_eq!(role_claim("a.!!!.c"), None);
        assert_eq!(role_claim(&token_with_payload("not json")), None);
        assert_eq!(role_claim(&token_with_payload(r#"{"sub":"u1"}"#)), None);
        assert_eq!(role_claim(&token_with_payload(r#"{"role":7}"#)), None);
    }
}
