use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::UtcDateTime;

/// Name of the cookie the login flow stores the token in.
pub const TOKEN_COOKIE: &str = "token";

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Encoding token failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("Token is invalid: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub id: Id<UserMarker>,
    /// Expiry, in seconds since the unix epoch.
    pub exp: u64,
}

/// Signs and verifies auth tokens with the server secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(ALGORITHM),
        }
    }

    pub fn issue(
        &self,
        user_id: Id<UserMarker>,
        lifetime: PositiveDuration,
    ) -> Result<String, TokenError> {
        self.issue_until(user_id, UtcDateTime::now() + lifetime.get())
    }

    pub fn issue_until(
        &self,
        user_id: Id<UserMarker>,
        expires_at: UtcDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: user_id,
            exp: u64::try_from(expires_at.unix_timestamp()).unwrap_or_default(),
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(TokenError::Encode)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::Invalid)?;

        Ok(data.claims)
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("algorithm", &ALGORITHM)
            .field("secret", &"[redacted]")
            .finish_non_exhaustive()
    }
}
