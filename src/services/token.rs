//! Session token issuing and verification
//!
//! Tokens are HMAC-SHA256 signed: `base64url(claims).base64url(mac)`. They
//! carry a subject and an expiry, nothing else. Verification is offline; no
//! token state is stored server-side.

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Subject embedded in admin session tokens
const ADMIN_SUBJECT: &str = "admin";

/// Error types for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to encode token claims: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    exp: i64,
}

/// Issues and verifies signed session tokens
pub struct TokenIssuer {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token valid for the configured TTL
    pub fn issue(&self) -> Result<String, TokenError> {
        self.issue_at(Utc::now())
    }

    pub(crate) fn issue_at(&self, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: ADMIN_SUBJECT.to_string(),
            exp: (now + self.ttl).timestamp(),
        };
        let payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(&claims)?);

        let mut mac = self.keyed_mac();
        mac.update(payload.as_bytes());
        let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());

        Ok(format!("{}.{}", payload, signature))
    }

    /// Check signature and expiry; any malformed input is simply invalid
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now())
    }

    pub(crate) fn verify_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let Some((payload, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(signature) = BASE64URL_NOPAD.decode(signature.as_bytes()) else {
            return false;
        };

        let mut mac = self.keyed_mac();
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            return false;
        }

        let Ok(bytes) = BASE64URL_NOPAD.decode(payload.as_bytes()) else {
            return false;
        };
        let Ok(claims) = serde_json::from_slice::<TokenClaims>(&bytes) else {
            return false;
        };

        claims.sub == ADMIN_SUBJECT && claims.exp > now.timestamp()
    }

    fn keyed_mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key length is unrestricted")
    }
}
