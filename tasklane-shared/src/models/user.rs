/// User model
///
/// Users are created by registration and are immutable afterwards; the only
/// later change is deletion, which cascades to every task they own.
///
/// # Snapshot layout
///
/// ```json
/// {
///   "id": 1,
///   "username": "alice",
///   "email": "alice@example.com",
///   "password_hash": "$argon2id$v=19$...",
///   "created_at": "2024-01-31T08:00:00Z"
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account as stored in the snapshot
///
/// Carries the credential hash, so it must never be returned to clients
/// directly. Use [`PublicUser`] for anything that leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID, allocated by the store (starts at 1)
    pub id: i64,

    /// Unique login name
    pub username: String,

    /// Unique email address, used for login
    pub email: String,

    /// Argon2id hash in PHC string format
    pub password_hash: String,

    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user
///
/// The store rejects a taken `username`, or an `email` matching an existing
/// one case-insensitively, with `StoreError::Conflict`. The check runs under
/// the same write lock as the insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Already-hashed password (never plaintext)
    pub password_hash: String,
}

/// User with the credential hash stripped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}
