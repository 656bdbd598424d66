//! Session gate for the realtime channel.
//!
//! Token minting lives with the credential service; this side only
//! verifies. A bearer token arrives on the upgrade request via `?token=`
//! or the `Authorization` header, is checked against the configured
//! signing secret, and yields the identity bound to the connection.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::UserId;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    /// "user" or "admin".
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
}

pub struct SessionGate {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionGate {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Pull the token out of the query parameter or a `Bearer` header.
    pub fn extract_token(query_token: Option<&str>, auth_header: Option<&str>) -> Option<String> {
        if let Some(token) = query_token {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
        auth_header
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}
