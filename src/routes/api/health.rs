use actix_web::{get, web, HttpResponse, Responder};

use crate::db::PostStore;

#[get("/health")]
pub async fn health(store: web::Data<dyn PostStore>) -> impl Responder {
    match store.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "database": "connected"
        })),
        Err(err) => {
            log::warn!("Health ping failed: {}", err);

            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "database": "disconnected"
            }))
        }
    }
}
