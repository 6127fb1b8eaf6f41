use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub type TokenResult<T> = Result<T, jsonwebtoken::errors::Error>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signs an HS256 session token for `user_id`, valid for `ttl` from `issued_at`.
pub fn create_jwt(
    user_id: &str,
    secret: &str,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> TokenResult<String> {
    let claims = Claims {
        sub: user_id.to_owned(),
        iat: issued_at.timestamp(),
        exp: (issued_at + ttl).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Checks the signature, then expiry against `now` rather than the wall
/// clock so callers with an injected time source stay consistent.
pub fn validate_jwt(token: &str, secret: &str, now: DateTime<Utc>) -> TokenResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    if token_data.claims.exp <= now.timestamp() {
        return Err(ErrorKind::ExpiredSignature.into());
    }

    Ok(token_data.claims)
}
