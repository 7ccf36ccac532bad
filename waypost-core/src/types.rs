//! Core data types for Waypost

use serde::{Deserialize, Serialize};

use crate::{ApiError, Result};

/// Minimum accepted length for a place description.
pub const MIN_DESCRIPTION_LEN: usize = 5;

/// Minimum accepted password length at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Unique user identifier using ULID for time-ordering
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(ulid::Ulid);

impl UserId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        UserId(ulid::Ulid::new())
    }

    /// Parse from the canonical string form.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse::<ulid::Ulid>()
            .map(UserId)
            .map_err(|_| ApiError::Validation(format!("invalid user id '{}'", s)))
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique place identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlaceId(ulid::Ulid);

impl PlaceId {
    pub fn generate() -> Self {
        PlaceId(ulid::Ulid::new())
    }

    pub fn parse(s: &str) -> Result<Self> {
        s.parse::<ulid::Ulid>()
            .map(PlaceId)
            .map_err(|_| ApiError::Validation(format!("invalid place id '{}'", s)))
    }

    pub fn as_ulid(&self) -> ulid::Ulid {
        self.0
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Persisted place record. `creator` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: PlaceId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub address: String,
    pub location: GeoPoint,
    pub creator: UserId,
}

/// Persisted user record. The owned-place set lives in the owner index,
/// not inside this record, so concurrent creates never rewrite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image_url: String,
}

/// Payload for creating a place. The creator comes from the verified
/// request identity, never from the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl NewPlace {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        if self.description.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(ApiError::Validation(format!(
                "description must be at least {} characters",
                MIN_DESCRIPTION_LEN
            )));
        }
        if self.address.trim().is_empty() {
            return Err(ApiError::Validation("address must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Payload for updating a place. Only title and description are mutable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacePatch {
    pub title: String,
    pub description: String,
}

impl PlacePatch {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        if self.description.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(ApiError::Validation(format!(
                "description must be at least {} characters",
                MIN_DESCRIPTION_LEN
            )));
        }
        Ok(())
    }
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::Validation(format!(
                "'{}' is not a usable email address",
                self.email
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Canonical form used for the uniqueness index.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Login payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Emails compare case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Outward shape of a place. The only way place data leaves the process.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceView {
    pub id: PlaceId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub address: String,
    pub location: GeoPoint,
    pub creator: UserId,
}

impl From<PlaceRecord> for PlaceView {
    fn from(record: PlaceRecord) -> Self {
        PlaceView {
            id: record.id,
            title: record.title,
            description: record.description,
            image_url: record.image_url,
            address: record.address,
            location: record.location,
            creator: record.creator,
        }
    }
}

/// Outward shape of a user. Has no password-hash field by construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub places: Vec<PlaceId>,
}

impl UserView {
    pub fn from_record(record: UserRecord, places: Vec<PlaceId>) -> Self {
        UserView {
            id: record.id,
            name: record.name,
            email: record.email,
            image_url: record.image_url,
            places,
        }
    }
}

/// Outward shape of a successful signup or login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user_id: UserId,
    pub email: String,
    pub token: String,
}
