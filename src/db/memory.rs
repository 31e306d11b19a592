use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{readable, PostStore};
use crate::errors::AppError;
use crate::types::{NewPost, Owner, Post, PostDocument, StoredOwner};

/// Process-local post store for tests and database-less runs (`POSTS_STORE=memory`).
#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<Vec<PostDocument>>,
    users: HashMap<ObjectId, Owner>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw documents; those without an `_id` get one.
    pub fn with_documents(documents: Vec<PostDocument>) -> Self {
        let posts = documents
            .into_iter()
            .map(|doc| PostDocument {
                id: doc.id.or_else(|| Some(ObjectId::new())),
                ..doc
            })
            .collect();

        Self {
            posts: RwLock::new(posts),
            users: HashMap::new(),
        }
    }

    /// Users that owner reference ids resolve to.
    pub fn with_users(mut self, users: impl IntoIterator<Item = (ObjectId, Owner)>) -> Self {
        self.users.extend(users);
        self
    }

    fn resolve(&self, mut doc: PostDocument) -> Option<Post> {
        let user = match &doc.owner {
            Some(StoredOwner::Reference(id)) => self.users.get(id).cloned(),
            _ => None,
        };
        if let Some(owner) = user {
            doc.owner = Some(owner.into());
        }
        readable(doc)
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().cloned().filter_map(|doc| self.resolve(doc)).collect())
    }

    async fn list_posts_by_state(&self, state: &str) -> Result<Vec<Post>, AppError> {
        let posts = self.posts.read().await;
        Ok(posts
            .iter()
            .filter(|doc| doc.state == state)
            .cloned()
            .filter_map(|doc| self.resolve(doc))
            .collect())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let document = PostDocument {
            id: Some(ObjectId::new()),
            ..post.into_document()
        };

        self.posts.write().await.push(document.clone());

        self.resolve(document)
            .ok_or_else(|| AppError::Internal("created post could not be read back".to_string()))
    }

    async fn delete_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };

        let mut posts = self.posts.write().await;
        let index = match posts.iter().position(|doc| doc.id == Some(oid)) {
            Some(index) => index,
            None => return Ok(None),
        };

        // Only remove what can be answered with
        match self.resolve(posts[index].clone()) {
            Some(post) => {
                posts.remove(index);
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
