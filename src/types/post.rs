use mongodb::bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppError, FieldError};

pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// Author of a post as exposed to clients. Never carries a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub username: String,
    pub email: String,
}

impl Owner {
    pub fn anonymous() -> Self {
        Owner {
            username: ANONYMOUS_USERNAME.to_string(),
            email: String::new(),
        }
    }
}

/// Owner as stored. Older documents may still carry a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerDocument {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<OwnerDocument> for Owner {
    fn from(doc: OwnerDocument) -> Self {
        Owner {
            username: doc.username,
            email: doc.email,
        }
    }
}

impl From<Owner> for OwnerDocument {
    fn from(owner: Owner) -> Self {
        OwnerDocument {
            username: owner.username,
            email: owner.email,
            password: None,
        }
    }
}

/// The `owner` field of a stored post: either the owner itself or the id of a
/// document in the users collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredOwner {
    Embedded(OwnerDocument),
    Reference(ObjectId),
}

impl From<Owner> for StoredOwner {
    fn from(owner: Owner) -> Self {
        StoredOwner::Embedded(owner.into())
    }
}

// Anything that is neither an embedded owner nor a reference id reads as missing.
fn deserialize_lenient_owner<'de, D>(deserializer: D) -> Result<Option<StoredOwner>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LenientOwner {
        Embedded(OwnerDocument),
        Reference(ObjectId),
        Other(Bson),
    }

    match Option::<LenientOwner>::deserialize(deserializer)? {
        Some(LenientOwner::Embedded(owner)) => Ok(Some(StoredOwner::Embedded(owner))),
        Some(LenientOwner::Reference(id)) => Ok(Some(StoredOwner::Reference(id))),
        Some(LenientOwner::Other(_)) | None => Ok(None),
    }
}

/// A post as it lives in the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub state: String,
    pub city: String,
    pub title: String,
    pub date: String,
    pub message: String,
    pub years_of_residence: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_owner",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner: Option<StoredOwner>,
}

impl PostDocument {
    /// Converts a stored document into its client representation.
    ///
    /// Returns `None` for documents that cannot satisfy the response shape
    /// (no identifier, non-finite years). Missing owners and references that
    /// were not resolved to a user come back as the anonymous owner.
    pub fn into_post(self) -> Option<Post> {
        let id = self.id?;
        if !self.years_of_residence.is_finite() {
            return None;
        }

        Some(Post {
            id: id.to_hex(),
            state: self.state,
            city: self.city,
            title: self.title,
            date: self.date,
            message: self.message,
            years_of_residence: self.years_of_residence,
            kind: self.kind,
            owner: match self.owner {
                Some(StoredOwner::Embedded(owner)) => owner.into(),
                Some(StoredOwner::Reference(_)) | None => Owner::anonymous(),
            },
        })
    }
}

/// A post as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub state: String,
    pub city: String,
    pub title: String,
    pub date: String,
    pub message: String,
    pub years_of_residence: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: Owner,
}

/// A validated create payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub state: String,
    pub city: String,
    pub title: String,
    pub date: String,
    pub message: String,
    pub years_of_residence: f64,
    pub kind: String,
    pub owner: Option<StoredOwner>,
}

impl NewPost {
    /// Checks an untyped request body field by field.
    ///
    /// Every problem is collected so the client sees all of them at once.
    /// `_id` and unknown keys are ignored; an owner `password` is dropped.
    /// `owner` may be an embedded `{username, email}` object or a user id.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let obj = match body.as_object() {
            Some(obj) => obj,
            None => {
                return Err(AppError::Validation(vec![FieldError::new(
                    "body",
                    "must be a JSON object",
                )]))
            }
        };

        let mut errors = Vec::new();

        let state = required_string(obj, "state", false, &mut errors);
        let city = required_string(obj, "city", true, &mut errors);
        let title = required_string(obj, "title", true, &mut errors);
        let date = required_string(obj, "date", false, &mut errors);
        let message = required_string(obj, "message", true, &mut errors);
        let kind = required_string(obj, "type", true, &mut errors);
        let years_of_residence = required_years(obj, &mut errors);
        let owner = optional_owner(obj, &mut errors);

        if let Some(state) = &state {
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
                errors.push(FieldError::new("state", "must be a two-letter region code"));
            }
        }

        match (state, city, title, date, message, years_of_residence, kind) {
            (Some(state), Some(city), Some(title), Some(date), Some(message), Some(years), Some(kind))
                if errors.is_empty() =>
            {
                Ok(NewPost {
                    state,
                    city,
                    title,
                    date,
                    message,
                    years_of_residence: years,
                    kind,
                    owner,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }

    /// Storage form. No owner is stored when none was sent.
    pub fn into_document(self) -> PostDocument {
        PostDocument {
            id: None,
            state: self.state,
            city: self.city,
            title: self.title,
            date: self.date,
            message: self.message,
            years_of_residence: self.years_of_residence,
            kind: self.kind,
            owner: self.owner,
        }
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    non_blank: bool,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(Value::String(s)) if non_blank && s.trim().is_empty() => {
            errors.push(FieldError::new(field, "must not be blank"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn required_years(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<f64> {
    const FIELD: &str = "years_of_residence";

    match obj.get(FIELD) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(FIELD, "is required"));
            None
        }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(years) if years.is_finite() && years >= 0.0 => Some(years),
            _ => {
                errors.push(FieldError::new(FIELD, "must be a non-negative number"));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new(FIELD, "must be a number"));
            None
        }
    }
}

fn optional_owner(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<StoredOwner> {
    let owner = match obj.get("owner") {
        None | Some(Value::Null) => return None,
        Some(Value::Object(owner)) => owner,
        Some(Value::String(id)) => match ObjectId::parse_str(id) {
            Ok(id) => return Some(StoredOwner::Reference(id)),
            Err(_) => {
                errors.push(FieldError::new("owner", "must be a 24-character hex user id"));
                return None;
            }
        },
        Some(_) => {
            errors.push(FieldError::new("owner", "must be an object or a user id"));
            return None;
        }
    };

    let mut field = |name: &str| match owner.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => {
            errors.push(FieldError::new(
                &format!("owner.{}", name),
                "is required and must be a string",
            ));
            None
        }
    };

    let username = field("username");
    let email = field("email");

    Some(StoredOwner::from(Owner {
        username: username?,
        email: email?,
    }))
}
