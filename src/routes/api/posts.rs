use actix_web::{delete, get, post, web, HttpResponse, Scope};
use serde_json::Value;

use crate::auth::BearerToken;
use crate::db::PostStore;
use crate::errors::AppError;
use crate::logging::RequestId;
use crate::types::NewPost;

// -------------------- Handlers --------------------

/// All posts.
#[get("")]
pub async fn list_posts(store: web::Data<dyn PostStore>) -> Result<HttpResponse, AppError> {
    let posts = store.list_posts().await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// Posts for one state. An unknown state is an empty list, not an error.
#[get("/state/{state}")]
pub async fn list_posts_by_state(
    store: web::Data<dyn PostStore>,
    state: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let posts = store.list_posts_by_state(&state).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[post("")]
pub async fn create_post(
    _token: BearerToken,
    request_id: RequestId,
    store: web::Data<dyn PostStore>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let new_post = NewPost::from_json(&body)?;
    let post = store.create_post(new_post).await?;

    log::info!("Created post {} in {} id={}", post.id, post.state, request_id);
    Ok(HttpResponse::Created().json(post))
}

/// Deletes a post and answers with what was removed.
#[delete("/id/{id}")]
pub async fn delete_post(
    _token: BearerToken,
    request_id: RequestId,
    store: web::Data<dyn PostStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();

    match store.delete_post(&id).await? {
        Some(post) => {
            log::info!("Deleted post {} id={}", post.id, request_id);
            Ok(HttpResponse::Ok().json(post))
        }
        None => Err(AppError::NotFound(format!("post {}", id))),
    }
}

// -------------------- Scope --------------------

pub fn posts_scope() -> Scope {
    web::scope("/posts")
        .service(list_posts)
        .service(list_posts_by_state)
        .service(create_post)
        .service(delete_post)
}
