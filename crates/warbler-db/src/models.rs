//! Database row types — these map directly to SQLite rows.
//! Distinct from warbler-types API models to keep the DB layer independent.

use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub created_at: String,
}

pub struct LikeRow {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub created_at: String,
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("password hashing failed")]
    Hash(#[source] anyhow::Error),
}

/// A pending user record: built by `signup`, persisted by
/// `Database::insert_user`. Uniqueness of username and email is only
/// checked at the insert, where it surfaces as `DbError::Integrity`.
#[derive(Debug)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
}

impl NewUser {
    /// Validate the password and hash it, producing a record ready to
    /// insert. An empty password is rejected here, before any database
    /// work; everything else is left to the schema constraints.
    pub fn signup(
        username: &str,
        email: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<Self, SignupError> {
        if password.is_empty() {
            return Err(SignupError::EmptyPassword);
        }

        let password = warbler_auth::hash_password(password).map_err(SignupError::Hash)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password,
            image_url: image_url.unwrap_or(DEFAULT_IMAGE_URL).to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
        })
    }
}
