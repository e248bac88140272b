//! Bearer-token issuance/verification and password hashing.
//!
//! Tokens are HS256 JWTs carrying the subject id and an expiry, signed with
//! a shared secret injected at construction — there is no process-wide
//! secret. Verification enforces both signature and expiry; either failure
//! reads the same to the caller (`Unauthorized`), so the wire leaks nothing
//! about which check tripped.

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

/// Token lifetime: seven days, matching the session length the API promises.
const TOKEN_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the authenticated user id.
    sub: u64,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// Signs and verifies bearer tokens with one shared secret.
///
/// Cheap to clone (keys are reference-counted internally) — each protected
/// route holds its own copy.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours: TOKEN_TTL_HOURS,
        }
    }

    #[cfg(test)]
    fn with_ttl_hours(secret: &str, ttl_hours: i64) -> Self {
        Self { ttl_hours, ..Self::new(secret) }
    }

    /// Issues a signed token for `user_id`, expiring after the configured TTL.
    pub fn issue(&self, user_id: u64) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now() + ChronoDuration::hours(self.ttl_hours)).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(AppError::internal)
    }

    /// Verifies signature and expiry, returning the subject id.
    pub fn verify(&self, token: &str) -> Result<u64, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AppError::unauthorized("invalid or expired token")
            })
    }
}

// ── Passwords ─────────────────────────────────────────────────────────────────

/// Hashes a plaintext password with bcrypt at the default cost.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).map_err(AppError::internal)
}

/// Constant-time check of `plain` against a stored bcrypt hash. A hash that
/// fails to parse counts as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips_subject() {
        let codec = TokenCodec::new("unit-secret");
        let token = codec.issue(42).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), 42);
    }

    #[test]
    fn expired_token_is_rejected_despite_valid_signature() {
        let codec = TokenCodec::with_ttl_hours("unit-secret", -1);
        let token = codec.issue(42).unwrap();
        assert!(matches!(codec.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenCodec::new("secret-a").issue(42).unwrap();
        assert!(matches!(
            TokenCodec::new("secret-b").verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let codec = TokenCodec::new("unit-secret");
        assert!(codec.verify("not-a-token").is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        // low cost to keep the test fast; production uses DEFAULT_COST
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-bcrypt-hash"));
    }
}
