// src/errors.rs
use actix_web::{
    body::MessageBody, dev::ServiceResponse, error::ResponseError, http::StatusCode,
    middleware::ErrorHandlerResponse, HttpMessage, HttpResponse, Result,
};
use serde::Serialize;
use serde_json::json;

use crate::config::IS_DEV;
use crate::logging::RequestId;

/// A single rejected field in a create payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(errors) => json!({
                "status": "error",
                "message": "Validation failed",
                "errors": errors,
            }),
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                json!({
                    "status": "error",
                    "message": status.canonical_reason().unwrap_or("Internal Server Error"),
                    "details": if *IS_DEV { Some(self.to_string()) } else { None },
                })
            }
            other => json!({
                "status": "error",
                "message": other.to_string(),
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

// ---------- Error Handlers ----------
//
// These rewrite framework-generated 404/500 responses (unmatched routes, extractor
// failures) into the same JSON envelope. Responses built from `AppError` pass through.

fn request_id<B>(res: &ServiceResponse<B>) -> String {
    res.request()
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_app_error<B>(res: &ServiceResponse<B>) -> bool {
    res.response()
        .error()
        .map_or(false, |err| err.as_error::<AppError>().is_some())
}

pub fn internal_server_error_handler<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>>
where
    B: MessageBody + 'static,
{
    if is_app_error(&res) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let status = res.status();
    let error_message = match res.response().error() {
        Some(err) => err.to_string(),
        None => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };

    log::error!("Internal server error: {} id={}", error_message, request_id(&res));

    let (req, _res) = res.into_parts();
    let json_response = HttpResponse::InternalServerError().json(json!({
        "status": "error",
        "message": status.canonical_reason().unwrap_or("Internal Server Error"),
        "details": if *IS_DEV { Some(error_message.as_str()) } else { None }
    }));

    Ok(ErrorHandlerResponse::Response(ServiceResponse::new(
        req,
        json_response.map_into_right_body(),
    )))
}

pub fn not_found_handler<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>>
where
    B: MessageBody + 'static,
{
    if is_app_error(&res) {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    log::debug!("No route for {} id={}", res.request().path(), request_id(&res));

    let (req, _res) = res.into_parts();
    let path = req.path().to_string();

    let json_response = HttpResponse::NotFound().json(json!({
        "status": "error",
        "message": "Not Found",
        "details": if *IS_DEV { Some(path.as_str()) } else { None }
    }));

    Ok(ErrorHandlerResponse::Response(ServiceResponse::new(
        req,
        json_response.map_into_right_body(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Unavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_internal_error_hides_details_behind_generic_message() {
        let resp = AppError::Internal("created post could not be read back".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[actix_web::test]
    async fn test_validation_envelope_lists_fields() {
        let err = AppError::Validation(vec![
            FieldError::new("city", "is required"),
            FieldError::new("years_of_residence", "must be a number"),
        ]);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["errors"][0]["field"], "city");
        assert_eq!(body["errors"][1]["field"], "years_of_residence");
    }
}
