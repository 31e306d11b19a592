pub mod api;
pub mod pages;

use actix_web::web;

use crate::errors::AppError;

pub use api::api_scope;

/// Malformed or non-JSON bodies become a 400 in the usual error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(pages::index)
        .service(api_scope());
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    use crate::app_config;
    use crate::config::AuthConfig;
    use crate::db::{MemoryPostStore, PostStore};
    use crate::error_handlers;

    macro_rules! wrapped_app {
        () => {{
            let store: Arc<dyn PostStore> = Arc::new(MemoryPostStore::new());
            test::init_service(
                App::new()
                    .configure(app_config(store, AuthConfig::default()))
                    .wrap(error_handlers()),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_unknown_route_gets_json_404() {
        let app = wrapped_app!();

        let req = test::TestRequest::get().uri("/api/nothing-here").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Not Found");
    }

    #[actix_web::test]
    async fn test_handler_404_passes_through() {
        let app = wrapped_app!();

        let req = test::TestRequest::delete()
            .uri("/api/posts/id/000000000000000000000000")
            .insert_header(("Authorization", "Bearer t"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "not found: post 000000000000000000000000");
    }
}
