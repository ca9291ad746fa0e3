use chrono::Duration;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use thoughts_types::api::{Claims, Identity};
use thoughts_types::models::User;

use crate::error::{ApiError, ApiResult};

/// Request-scoped caller, attached to every GraphQL request. `None` for
/// anonymous requests and for tokens that failed verification.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

/// Issues and checks the HS256 tokens handed out by `addUser` and `login`.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user: &User) -> ApiResult<String> {
        let exp = chrono::Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(ApiError::TokenLifetime)?;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            exp: exp.timestamp().max(0) as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Returns the identity in a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<Identity> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                debug!("Rejected token: {}", e);
                None
            }
        }
    }
}
