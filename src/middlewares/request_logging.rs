use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;

use crate::logging::RequestLogger;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with a fresh id and writes one access log line per response.
pub struct RequestLogging;

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingMiddleware { service }))
    }
}

pub struct RequestLoggingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let request_id = RequestLogger::create_request_id();

        // Extract request info before moving req
        let ip = RequestLogger::extract_ip(req.request());
        let user_agent = RequestLogger::extract_user_agent(req.request());
        let method = req.method().to_string();
        let path = req.path().to_string();

        req.extensions_mut().insert(request_id.clone());

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let elapsed = start.elapsed().as_millis() as u64;
            let status = res.status().as_u16();

            if let Ok(value) = HeaderValue::from_str(&request_id.0) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            if status >= 500 {
                log::error!(
                    "{} {} {} {}ms ip={} ua=\"{}\" id={}",
                    method, path, status, elapsed, ip, user_agent, request_id.0
                );
            } else {
                log::info!(
                    "{} {} {} {}ms ip={} ua=\"{}\" id={}",
                    method, path, status, elapsed, ip, user_agent, request_id.0
                );
            }

            Ok(res)
        })
    }
}
