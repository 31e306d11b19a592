use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::config::AuthConfig;
use crate::errors::AppError;

/// Token taken from `Authorization: Bearer <token>`.
///
/// Extracting it rejects the request with 401 when the header is missing or
/// malformed. When an `AuthConfig` with a token is registered, the token must
/// also match it; without one only presence is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn parse(header_value: &str) -> Result<Self, AppError> {
        let (scheme, token) = header_value
            .trim()
            .split_once(' ')
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".into()))?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AppError::Unauthorized(
                "Authorization scheme must be Bearer".into(),
            ));
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Bearer token is empty".into()));
        }

        Ok(BearerToken(token.to_string()))
    }

    fn authorize(req: &HttpRequest) -> Result<Self, AppError> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header format".into()))?;

        let token = Self::parse(value)?;

        let expected = req
            .app_data::<web::Data<AuthConfig>>()
            .and_then(|config| config.api_token.as_deref());

        if let Some(expected) = expected {
            if !constant_time_eq(token.0.as_bytes(), expected.as_bytes()) {
                log::warn!("Rejected bearer token on {} {}", req.method(), req.path());
                return Err(AppError::Unauthorized("Invalid token".into()));
            }
        }

        Ok(token)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::authorize(req))
    }
}
