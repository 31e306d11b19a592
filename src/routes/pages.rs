use actix_web::{get, http::header, HttpResponse};

pub const POSTS_PATH: &str = "/api/posts";

// -------------------- Handlers --------------------

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, POSTS_PATH))
        .finish()
}
