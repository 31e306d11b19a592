use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::convert::Infallible;
use std::fmt;
use std::future::{ready, Ready};
use uuid::Uuid;

/// Per-request identifier, stored in request extensions and echoed as `x-request-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handlers take the id the logging middleware assigned. Outside that
/// middleware it reads as `unknown`.
impl FromRequest for RequestId {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId("unknown".to_string()));
        ready(Ok(id))
    }
}

pub struct RequestLogger;

impl RequestLogger {
    pub fn create_request_id() -> RequestId {
        RequestId(Uuid::new_v4().to_string())
    }

    pub fn extract_ip(req: &HttpRequest) -> String {
        req.connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn extract_user_agent(req: &HttpRequest) -> String {
        req.headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_request_ids_are_unique_uuids() {
        let a = RequestLogger::create_request_id();
        let b = RequestLogger::create_request_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a.0).is_ok());
    }

    #[test]
    fn test_extract_user_agent() {
        let req = TestRequest::default()
            .insert_header(("user-agent", "curl/8.0"))
            .to_http_request();
        assert_eq!(RequestLogger::extract_user_agent(&req), "curl/8.0");

        let req = TestRequest::default().to_http_request();
        assert_eq!(RequestLogger::extract_user_agent(&req), "unknown");
    }

    #[actix_web::test]
    async fn test_request_id_extracts_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(RequestId("abc".to_string()));
        let id = RequestId::extract(&req).await.unwrap();
        assert_eq!(id.0, "abc");

        let req = TestRequest::default().to_http_request();
        assert_eq!(RequestId::extract(&req).await.unwrap().0, "unknown");
    }
}
