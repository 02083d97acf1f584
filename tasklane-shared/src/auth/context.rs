/// Authenticated principal for one request
///
/// Built from validated token claims by the HTTP layer and placed in the
/// request extensions. Handlers scope every store call with
/// [`AuthContext::user_id`], never with an ID taken from the request.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::jwt::{Claims, JwtError};

/// Privilege tier carried in the token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication context added to request extensions
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::context::{AuthContext, Role};
/// use tasklane_shared::auth::jwt::Claims;
///
/// let auth = AuthContext::from_claims(&Claims::new(7, "alice", Role::User)).unwrap();
/// assert_eq!(auth.user_id, 7);
/// assert!(!auth.is_admin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID (`0` for configured admin accounts)
    pub user_id: i64,

    pub username: String,

    pub role: Role,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_claims(claims: &Claims) -> Result<Self, JwtError> {
        Ok(Self {
            user_id: claims.user_id()?,
            username: claims.username.clone(),
            role: claims.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
