use std::{fmt, time::Duration};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const HEADER_ALG: &str = "HS256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies HS256 JSON Web Tokens carrying the user id as `sub`.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Vec<u8>,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl,
        }
    }

    #[must_use]
    pub fn issue(&self, user_id: Uuid) -> String {
        self.issue_at(user_id, Utc::now())
    }

    #[must_use]
    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> String {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: now.timestamp().saturating_add(ttl),
        };
        let header = Header {
            alg: HEADER_ALG.to_string(),
            typ: "JWT".to_string(),
        };

        // 構造体のシリアライズは失敗しない
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap_or_default());
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input).finalize().into_bytes());

        format!("{signing_input}.{signature}")
    }

    /// # Errors
    /// Fails on malformed structure, a foreign algorithm, a bad signature or an expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// # Errors
    /// See [`TokenIssuer::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json(header)?;
        if header.alg != HEADER_ALG {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let (signing_input, _) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        self.mac(signing_input)
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_json(payload)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(signing_input.as_bytes());
        mac
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-0123456789", WEEK)
    }

    #[test]
    fn issued_token_verifies() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let token = issuer().issue_at(user_id, now);

        let claims = issuer().verify_at(&token, now).expect("token verifies");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now();
        let token = issuer().issue_at(Uuid::new_v4(), issued);
        let later = issued + chrono::Duration::days(7);

        assert_eq!(issuer().verify_at(&token, later), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenIssuer::new("another-secret-abcdef", WEEK).issue(Uuid::new_v4());

        assert_eq!(issuer().verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issuer().issue(Uuid::new_v4());
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            sub: Uuid::new_v4(),
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).expect("serializes"));
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(issuer().verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn none_algorithm_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let token = issuer().issue(Uuid::new_v4());
        let rest: Vec<&str> = token.splitn(2, '.').collect();

        assert_eq!(
            issuer().verify(&format!("{header}.{}", rest[1])),
            Err(TokenError::UnsupportedAlgorithm)
        );
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("a.b")]
    #[case("a.b.c.d")]
    #[case("!!.??.**")]
    fn malformed_tokens_are_rejected(#[case] token: &str) {
        assert_eq!(issuer().verify(token), Err(TokenError::Malformed));
    }

    #[test]
    fn debug_output_hides_key() {
        let rendered = format!("{:?}", issuer());
        assert!(!rendered.contains("test-secret"));
    }
}
