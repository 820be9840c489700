use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[cfg(test)]
    #[error("jwt encoding failed")]
    JwtEncoding,
    #[error("session token expired")]
    Expired,
    #[error("session token rejected")]
    Invalid,
    #[error("session token has no subject")]
    MissingSubject,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Session claims minted by the host LMS. `sub` is the host user id.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: i64,
}

#[cfg(test)]
const TEST_TOKEN_LIFETIME: time::Duration = time::Duration::minutes(60);

/// Signs a session for `user_id`; the host LMS mints these in production.
#[cfg(test)]
pub(crate) fn create_access_token(
    user_id: &str,
    settings: &Settings,
    expires_in: Option<time::Duration>,
) -> Result<String, SecurityError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let lifetime = expires_in.unwrap_or(TEST_TOKEN_LIFETIME);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (time::OffsetDateTime::now_utc() + lifetime).unix_timestamp(),
    };
    let key = EncodingKey::from_secret(settings.security().secret_key.as_bytes());

    encode(&Header::new(algorithm(settings)?), &claims, &key)
        .map_err(|_| SecurityError::JwtEncoding)
}

/// Returns the host user id carried by a valid, unexpired session token.
pub(crate) fn authenticate(token: &str, settings: &Settings) -> Result<String, SecurityError> {
    let mut validation = Validation::new(algorithm(settings)?);
    validation.set_required_spec_claims(&["exp", "sub"]);
    let key = DecodingKey::from_secret(settings.security().secret_key.as_bytes());

    let claims = decode::<Claims>(token, &key, &validation)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => SecurityError::Expired,
            _ => SecurityError::Invalid,
        })?
        .claims;

    let user_id = claims.sub.trim();
    if user_id.is_empty() {
        return Err(SecurityError::MissingSubject);
    }
    Ok(user_id.to_string())
}

fn algorithm(settings: &Settings) -> Result<Algorithm, SecurityError> {
    match settings.security().algorithm.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(SecurityError::UnsupportedAlgorithm(other.to_string())),
    }
}
