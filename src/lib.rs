pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod middlewares;
pub mod routes;
pub mod types;

use actix_cors::Cors;
use actix_web::{http::StatusCode, middleware::ErrorHandlers, web};
use std::sync::Arc;

pub use config::{AuthConfig, Config, StoreKind};
pub use db::PostStore;
pub use errors::AppError;

/// Registers shared state and every route on an `App`.
///
/// Middleware is left to the caller so tests can mount the bare routes.
/// [`posts_app!`] adds the full stack the server runs with.
pub fn app_config(
    store: Arc<dyn PostStore>,
    auth: AuthConfig,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::from(store))
            .app_data(web::Data::new(auth));
        routes::configure(cfg);
    }
}

/// Any origin, method and header; preflights cached for an hour.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

/// Framework 404/500 responses rewritten into the JSON error envelope.
pub fn error_handlers<B: actix_web::body::MessageBody + 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(
            StatusCode::INTERNAL_SERVER_ERROR,
            errors::internal_server_error_handler,
        )
        .handler(StatusCode::NOT_FOUND, errors::not_found_handler)
}

/// The application exactly as the server runs it: routes plus error
/// envelopes, CORS, trailing-slash trimming and request logging.
#[macro_export]
macro_rules! posts_app {
    ($store:expr, $auth:expr) => {
        ::actix_web::App::new()
            .configure($crate::app_config($store, $auth))
            .wrap($crate::error_handlers())
            .wrap($crate::cors())
            .wrap(::actix_web::middleware::NormalizePath::trim())
            .wrap($crate::middlewares::RequestLogging)
    };
}
