pub mod connection;
pub mod memory;
pub mod posts;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::types::{NewPost, Post, PostDocument};

pub use connection::{connect_with_retry, verify_connection, MongoDb};
pub use memory::MemoryPostStore;
pub use posts::MongoPostStore;

/// Persistence seam for posts. Handlers only ever see this trait.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every readable post, in the store's natural order.
    async fn list_posts(&self) -> Result<Vec<Post>, AppError>;

    /// Posts whose `state` equals `state` exactly.
    async fn list_posts_by_state(&self, state: &str) -> Result<Vec<Post>, AppError>;

    /// Inserts the post and returns it with its assigned identifier.
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError>;

    /// Removes the post and returns its last state, or `None` if no such post exists.
    async fn delete_post(&self, id: &str) -> Result<Option<Post>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;

    /// Releases the underlying connection.
    async fn shutdown(&self) {}
}

/// `PostDocument::into_post`, logging the documents it has to leave out.
pub(crate) fn readable(doc: PostDocument) -> Option<Post> {
    let id = doc.id;
    let post = doc.into_post();
    if post.is_none() {
        log::warn!("Skipping unreadable post {:?}", id);
    }
    post
}
