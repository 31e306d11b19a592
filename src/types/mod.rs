pub mod post;

pub use post::{NewPost, Owner, OwnerDocument, Post, PostDocument, StoredOwner};
