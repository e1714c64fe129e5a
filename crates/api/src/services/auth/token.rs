//! Bearer tokens: compact HS256 JWS.
//!
//! `base64url(header) . base64url(claims) . base64url(hmac_sha256(key, header.claims))`
//!
//! Only `HS256` is accepted. Signatures are compared in constant time via
//! [`Mac::verify_slice`].

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use marketplace_core::{Role, UserId};

use crate::models::Identity;

type HmacSha256 = Hmac<Sha256>;

const HEADER: Header<'static> = Header {
    alg: "HS256",
    typ: "JWT",
};

/// Errors issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not three dot-separated base64url segments, or bad JSON inside.
    #[error("malformed token")]
    Malformed,

    /// Header names an algorithm other than HS256.
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    /// Signature does not match.
    #[error("invalid token signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// The signing key was rejected by HMAC.
    #[error("invalid signing key")]
    InvalidKey,

    /// Claims could not be serialised.
    #[error("token encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expires at, seconds since the Unix epoch.
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Signs and verifies bearer tokens with a shared secret.
///
/// Implements `Debug` manually so the key never reaches logs.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer issuing tokens valid for `ttl_hours`.
    #[must_use]
    pub fn new(secret: SecretString, ttl_hours: i64) -> Self {
        Self {
            secret,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token for `identity`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if signing fails.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if signing fails.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.user_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&HEADER)?);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, forged or expired.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header_bytes = decode_segment(header)?;
        let parsed: Header<'_> =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if parsed.alg != HEADER.alg {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = decode_segment(signature)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims =
            serde_json::from_slice(&decode_segment(payload)?).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(Identity::from(claims))
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)
    }

    fn sign(&self, input: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(SecretString::from("q8#Vn2!pR5@xL9$wT3^kM7&zB4*cF6(h"), 24)
    }

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new(42),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::Seller,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let token = signer.issue(&identity()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(signer.verify(&token).unwrap(), identity());
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued = Utc::now() - Duration::hours(25);
        let token = signer.issue_at(&identity(), issued).unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = signer().issue(&identity()).unwrap();
        let other = TokenSigner::new(SecretString::from("another-key-0123456789abcdefghij"), 24);
        assert!(matches!(other.verify(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer();
        let token = signer.issue(&identity()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut forged = identity();
        forged.role = Role::Admin;
        let forged_claims = Claims {
            sub: forged.user_id,
            name: forged.name,
            email: forged.email,
            role: forged.role,
            iat: 0,
            exp: i64::MAX,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert!(matches!(signer.verify(&tampered), Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = signer();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(
                matches!(signer.verify(token), Err(TokenError::Malformed)),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let signer = signer();
        let token = signer.issue(&identity()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let downgraded = format!("{header}.{}.{}", parts[1], parts[2]);

        assert!(matches!(
            signer.verify(&downgraded),
            Err(TokenError::UnsupportedAlgorithm)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("q8#Vn2"));
    }
}
