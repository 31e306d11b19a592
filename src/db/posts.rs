use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};

use super::{readable, MongoDb, PostStore};
use crate::errors::AppError;
use crate::types::{NewPost, Post, PostDocument};

/// Where `$lookup` puts the user an owner reference points at.
const OWNER_LOOKUP: &str = "owner_lookup";

/// MongoDB-backed post store.
pub struct MongoPostStore {
    db: MongoDb,
}

impl MongoPostStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    async fn find_posts(&self, filter: Document) -> Result<Vec<Post>, AppError> {
        let pipeline = read_pipeline(filter, self.db.users_collection_name());
        let mut cursor = self.db.raw_posts().aggregate(pipeline).await?;
        let mut posts = Vec::new();

        while let Some(raw) = cursor.try_next().await? {
            if let Some(post) = decode_post(raw) {
                posts.push(post);
            }
        }

        Ok(posts)
    }
}

/// Matches only documents that carry every field of a post with a type the
/// decoder accepts.
fn well_formed() -> Document {
    doc! {
        "state": { "$type": "string" },
        "city": { "$type": "string" },
        "title": { "$type": "string" },
        "date": { "$type": "string" },
        "message": { "$type": "string" },
        // decimal is a "number" to MongoDB but doesn't decode into f64
        "years_of_residence": { "$type": ["double", "int", "long"], "$ne": f64::NAN },
        "type": { "$type": "string" },
    }
}

/// Filter, then join owner references against the users collection without
/// ever pulling a password out of it.
fn read_pipeline(filter: Document, users_collection: &str) -> Vec<Document> {
    vec![
        doc! { "$match": filter },
        doc! {
            "$lookup": {
                "from": users_collection,
                "localField": "owner",
                "foreignField": "_id",
                "as": OWNER_LOOKUP,
            }
        },
        doc! { "$project": { format!("{}.password", OWNER_LOOKUP): 0 } },
    ]
}

/// Replaces a reference `owner` with the user it was joined to, if any.
fn resolve_owner(mut raw: Document) -> Document {
    let user = match raw.remove(OWNER_LOOKUP) {
        Some(Bson::Array(users)) => users.into_iter().next(),
        _ => None,
    };

    if let Some(user) = user {
        if matches!(raw.get("owner"), Some(Bson::ObjectId(_))) {
            raw.insert("owner", user);
        }
    }

    raw
}

fn decode_post(raw: Document) -> Option<Post> {
    let id = raw.get_object_id("_id").ok();

    match bson::from_document::<PostDocument>(resolve_owner(raw)) {
        Ok(doc) => readable(doc),
        Err(e) => {
            log::warn!("Skipping malformed post {:?}: {}", id, e);
            None
        }
    }
}

#[async_trait]
impl PostStore for MongoPostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.find_posts(well_formed()).await
    }

    async fn list_posts_by_state(&self, state: &str) -> Result<Vec<Post>, AppError> {
        let mut filter = well_formed();
        filter.insert("state", state);
        self.find_posts(filter).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let id = ObjectId::new();
        let document = PostDocument {
            id: Some(id),
            ..post.into_document()
        };

        self.db.posts().insert_one(&document).await?;

        // Read back through the same pipeline so owner references come out resolved
        self.find_posts(doc! { "_id": id })
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("created post {} could not be read back", id)))
    }

    async fn delete_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        // Anything that isn't an ObjectId can't name a stored post
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };

        let mut filter = well_formed();
        filter.insert("_id", oid);

        // Only remove what can be answered with
        let post = match self.find_posts(filter).await?.into_iter().next() {
            Some(post) => post,
            None => return Ok(None),
        };

        let result = self.db.raw_posts().delete_one(doc! { "_id": oid }).await?;
        if result.deleted_count == 0 {
            return Ok(None);
        }

        Ok(Some(post))
    }

    async fn ping(&self) -> Result<(), AppError> {
        super::verify_connection(&self.db).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.db.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(overrides: Document) -> Document {
        let mut raw = doc! {
            "_id": ObjectId::new(),
            "state": "WA",
            "city": "Seattle",
            "title": "Rain",
            "date": "3-4-2021",
            "message": "It rains",
            "years_of_residence": 4_i32,
            "type": "Experience",
            "owner": { "username": "lee", "email": "lee@example.com" },
        };
        raw.extend(overrides);
        raw
    }

    #[test]
    fn test_decode_complete_post() {
        let post = decode_post(stored(doc! {})).unwrap();
        assert_eq!(post.city, "Seattle");
        assert_eq!(post.years_of_residence, 4.0);
        assert_eq!(post.owner.username, "lee");
    }

    #[test]
    fn test_decode_skips_mistyped_fields() {
        assert!(decode_post(stored(doc! { "years_of_residence": "four" })).is_none());
        assert!(decode_post(stored(doc! { "city": 7_i32 })).is_none());
        assert!(decode_post(stored(doc! { "years_of_residence": f64::NAN })).is_none());
    }

    #[test]
    fn test_well_formed_filter_covers_every_field() {
        let filter = well_formed();
        for field in ["state", "city", "title", "date", "message", "years_of_residence", "type"] {
            assert!(filter.contains_key(field), "missing {}", field);
        }
    }

    #[test]
    fn test_well_formed_years_excludes_undecodable_numbers() {
        let years = well_formed().get_document("years_of_residence").unwrap().clone();

        let types: Vec<&str> = years
            .get_array("$type")
            .unwrap()
            .iter()
            .filter_map(Bson::as_str)
            .collect();
        assert_eq!(types, vec!["double", "int", "long"]);
        assert!(!types.contains(&"decimal"));
        assert!(years.get_f64("$ne").unwrap().is_nan());
    }

    #[test]
    fn test_read_pipeline_hides_user_passwords() {
        let pipeline = read_pipeline(doc! { "state": "CA" }, "members");
        assert_eq!(pipeline.len(), 3);

        let lookup = pipeline[1].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "members");
        assert_eq!(lookup.get_str("as").unwrap(), OWNER_LOOKUP);

        let project = pipeline[2].get_document("$project").unwrap();
        assert_eq!(project.get_i32("owner_lookup.password").unwrap(), 0);
    }

    #[test]
    fn test_reference_owner_resolves_to_user() {
        let user_id = ObjectId::new();
        let raw = stored(doc! {
            "owner": user_id,
            OWNER_LOOKUP: [{ "_id": user_id, "username": "ana", "email": "ana@example.com" }],
        });

        let post = decode_post(raw).unwrap();
        assert_eq!(post.owner.username, "ana");
        assert_eq!(post.owner.email, "ana@example.com");
    }

    #[test]
    fn test_dangling_reference_reads_as_anonymous() {
        let raw = stored(doc! { "owner": ObjectId::new(), OWNER_LOOKUP: [] });

        let post = decode_post(raw).unwrap();
        assert_eq!(post.owner.username, crate::types::post::ANONYMOUS_USERNAME);
    }

    #[test]
    fn test_embedded_owner_ignores_lookup() {
        let raw = stored(doc! {
            OWNER_LOOKUP: [{ "username": "other", "email": "other@example.com" }],
        });
        assert_eq!(decode_post(raw).unwrap().owner.username, "lee");
    }
}
