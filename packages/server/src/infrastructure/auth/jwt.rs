//! HS256 JWT implementation of [`TokenVerifier`].

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use collab_shared::time::Clock;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    domain::{AuthError, Identity, TokenVerifier, UserId},
};

/// Minimum accepted length of the shared secret.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    iat: i64,
    exp: i64,
}

/// Expiry is checked against the injected [`Clock`], not the library's
/// system time, so issuance and verification share one notion of now.
#[derive(Clone)]
pub struct JwtTokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtTokenVerifier {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::WeakJwtSecret {
                min: MIN_SECRET_LENGTH,
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    fn now_seconds(&self) -> i64 {
        self.clock.now_millis() / 1000
    }

    /// Mint a token for `user_id`, valid for `ttl_seconds`.
    ///
    /// Token issuance belongs to the authentication service; this exists for
    /// local development and tests.
    pub fn issue(
        &self,
        user_id: &str,
        display_name: &str,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        self.issue_at(user_id, display_name, self.now_seconds(), ttl_seconds)
    }

    fn issue_at(
        &self,
        user_id: &str,
        display_name: &str,
        issued_at: i64,
        ttl_seconds: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            nome: Some(display_name.to_string()),
            name: None,
            iat: issued_at,
            exp: issued_at + ttl_seconds,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;
        if claims.exp <= self.now_seconds() {
            return Err(AuthError::InvalidToken("token expired".to_string()));
        }

        let display_name = claims
            .nome
            .or(claims.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| claims.sub.clone());
        let user_id = UserId::new(claims.sub)?;

        Ok(Identity::new(user_id, display_name))
    }
}
