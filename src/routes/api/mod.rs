pub mod health;
pub mod posts;

use actix_web::{web, Scope};

pub use health::health as health_handler;
pub use posts::posts_scope;

pub fn api_scope() -> Scope {
    web::scope("/api")
        .service(health_handler)
        .service(posts_scope())
}
