//! Access token signing and verification
//!
//! Access tokens are HS256-signed JWTs carrying the account email, its
//! role and an expiry. They are never persisted; revocation happens only
//! through expiry, so the lifetime is kept short.

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use leave_core::{AuthConfig, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims embedded in every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - account email
    pub sub: String,
    /// Account role at issue time
    pub role: Role,
    /// Expiration timestamp (Unix seconds)
    pub exp: i64,
}

/// Reasons a token failed to sign or verify.
///
/// Kept for logging only; callers outside this module see a single
/// invalid-token outcome.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token format: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// Issues and verifies access tokens with one shared secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.secret_key)
    }

    /// Sign `{sub, role, exp = now + ttl}`.
    ///
    /// A zero or negative `ttl` produces a token that never verifies.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        ttl: chrono::Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            role,
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::EncodingError)
    }

    /// Check signature and expiry and return the claims.
    ///
    /// Expiry is strict: a token whose `exp` equals the current second is
    /// already expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::InvalidToken(e.to_string()),
            },
        )?;

        if token_data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::ExpiredToken);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret")
    }

    #[test]
    fn test_issue_and_verify_token() {
        let signer = signer();
        let token = signer
            .issue("alice@example.com", Role::Manager, Duration::minutes(15))
            .expect("Failed to issue token");

        let claims = signer.verify(&token).expect("Failed to verify token");
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.role, Role::Manager);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_non_positive_ttl_never_verifies() {
        let signer = signer();
        for ttl in [Duration::zero(), Duration::seconds(-1), Duration::minutes(-30)] {
            let token = signer.issue("bob@example.com", Role::Employee, ttl).unwrap();
            assert!(
                matches!(signer.verify(&token), Err(TokenError::ExpiredToken)),
                "token with ttl {ttl} verified"
            );
        }
    }

    #[test]
    fn test_garbage_token() {
        let result = signer().verify("invalid.token.here");
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
        assert!(signer().verify("").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = TokenSigner::new("secret1")
            .issue("a@example.com", Role::Employee, Duration::minutes(5))
            .unwrap();

        let result = TokenSigner::new("secret2").verify(&token);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_missing_subject_rejected() {
        #[derive(Serialize)]
        struct NoSubject {
            role: Role,
            exp: i64,
        }

        let claims = NoSubject {
            role: Role::Employee,
            exp: Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(signer().verify(&token).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let claims = serde_json::json!({
            "sub": "a@example.com",
            "role": "admin",
            "exp": Utc::now().timestamp() + 600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            signer().verify(&token),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims {
            sub: "a@example.com".to_string(),
            role: Role::Employee,
            exp: Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(signer().verify(&token).is_err());
    }
}
