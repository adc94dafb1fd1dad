//! Token claims decoding and validity
//!
//! The client decodes the token payload only to read claims; it trusts the
//! backend's signature implicitly, since a client cannot meaningfully verify
//! a server-signed token. A token that fails to decode is an unusable token,
//! never an "authenticated as nobody" state.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use serde::Deserialize;

use crate::error::AuthError;
use crate::user::flexible_id_opt;

/// Claims the client reads from a token payload
#[derive(Debug, Clone, Deserialize)]
pub struct JwtClaims {
    /// Expiry, seconds since epoch
    pub exp: Option<i64>,
    /// Issued-at, seconds since epoch
    #[serde(default)]
    pub iat: Option<i64>,
    /// Subject (user identifier)
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub sub: Option<String>,
}

/// Decode the payload segment of a JWT without verifying its signature
///
/// # Errors
/// Returns [`AuthError::MalformedToken`] if the token is not three
/// dot-separated segments, the payload is not valid base64url, or the
/// decoded payload is not a JSON claims object.
pub fn decode_claims(token: &str) -> Result<JwtClaims, AuthError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => {
            return Err(AuthError::MalformedToken(
                "token is not a three-segment JWT".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not a claims object: {}", e)))
}

/// Extract a token's expiry as milliseconds since epoch
///
/// # Errors
/// Returns [`AuthError::MalformedToken`] if the token cannot be decoded or
/// carries no `exp` claim.
pub fn expiry_millis(token: &str) -> Result<i64, AuthError> {
    let claims = decode_claims(token)?;
    let exp = claims
        .exp
        .ok_or_else(|| AuthError::MalformedToken("token has no exp claim".to_string()))?;
    Ok(exp * 1000)
}

/// Decide whether a token is still usable
///
/// Returns `false` if decoding fails, the `exp` claim is missing, or the
/// token expires within `buffer_secs` from now. The buffer exists so a
/// request is never launched with a token that expires mid-flight; callers
/// checking a *refresh* token pass a day-scale buffer rather than using a
/// different rule.
///
/// Pure decision: never mutates state, never performs I/O.
pub fn is_valid(token: &str, buffer_secs: i64) -> bool {
    let exp = match decode_claims(token) {
        Ok(JwtClaims { exp: Some(exp), .. }) => exp,
        _ => return false,
    };
    Utc::now().timestamp() + buffer_secs < exp
}


#[cfg(test)]
mod tests {
    use super::test_support::{token_expiring_in, token_with_payload};
    use super::*;

    #[test]
    fn test_decode_claims_reads_exp_and_sub() {
        let token = token_with_payload(&serde_json::json!({ "exp": 1_900_000_000, "sub": 7 }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.sub.as_deref(), Some("7"));
    }

    #[test]
    fn test_decode_claims_rejects_non_jwt() {
        assert!(matches!(
            decode_claims("not-a-token"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            decode_claims("only.two"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_claims_rejects_bad_base64() {
        assert!(matches!(
            decode_claims("aaa.!!!.bbb"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_claims_rejects_non_json_payload() {
        let body = URL_SAFE_NO_PAD.encode(b"plain text");
        let token = format!("h.{}.s", body);
        assert!(matches!(
            decode_claims(&token),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_expiry_millis_scales_seconds() {
        let token = token_with_payload(&serde_json::json!({ "exp": 1_700_000_000 }));
        assert_eq!(expiry_millis(&token).unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_expiry_millis_missing_claim_is_malformed() {
        let token = token_with_payload(&serde_json::json!({ "sub": "u-1" }));
        assert!(matches!(
            expiry_millis(&token),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_is_valid_future_exp_beyond_buffer() {
        let token = token_expiring_in(300);
        assert!(is_valid(&token, 60));
    }

    #[test]
    fn test_is_valid_exp_within_buffer() {
        // Expires in 30s, which is inside the 60s safety margin.
        let token = token_expiring_in(30);
        assert!(!is_valid(&token, 60));
    }

    #[test]
    fn test_is_valid_past_exp() {
        let token = token_expiring_in(-10);
        assert!(!is_valid(&token, 60));
    }

    #[test]
    fn test_is_valid_day_scale_buffer_for_refresh_tokens() {
        // A refresh token expiring in an hour is unusable under the
        // day-scale margin.
        let token = token_expiring_in(3600);
        assert!(!is_valid(&token, 86_400));
        assert!(is_valid(&token, 60));
    }

    #[test]
    fn test_is_valid_undecodable_token_is_invalid() {
        assert!(!is_valid("garbage", 60));
    }
}
