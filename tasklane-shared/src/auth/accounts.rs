/// Account registration and login flows
///
/// These are the only places credentials are issued. Registration stores an
/// Argon2id hash, login verifies against it and signs a token, and admin
/// login does the same against the configured [`AdminDirectory`].
///
/// Login failures are deliberately uniform: an unknown email and a wrong
/// password both yield [`AccountError::InvalidCredentials`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasklane_shared::auth::accounts::{login, register, AccountPolicy, Registration};
/// use tasklane_shared::store::{backend::MemoryBackend, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Store::open(Arc::new(MemoryBackend::new())).await;
/// let policy = AccountPolicy::new("your-secret-key-at-least-32-bytes");
///
/// let user = register(
///     &store,
///     &policy,
///     Registration {
///         username: "alice".to_string(),
///         email: "alice@example.com".to_string(),
///         password: "secret1".to_string(),
///     },
/// )
/// .await?;
///
/// let session = login(&store, &policy, "alice@example.com", "secret1").await?;
/// assert_eq!(session.user.id, user.id);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use validator::ValidateEmail;

use super::{
    admin::{AdminDirectory, ADMIN_USER_ID},
    context::Role,
    jwt::{create_token, Claims, JwtError, DEFAULT_TOKEN_TTL_HOURS},
    password::{
        hash_password, validate_password_policy, verify_dummy_password, verify_password,
        PasswordError, DEFAULT_MIN_PASSWORD_LENGTH,
    },
};
use crate::models::user::{NewUser, PublicUser, User};
use crate::store::{Store, StoreError};

/// Error type for account flows
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Registration input rejected
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Email or username already registered
    #[error("{0}")]
    Conflict(String),

    /// Unknown account or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => AccountError::Conflict(message),
            other => AccountError::Store(other),
        }
    }
}

/// Token signing and password rules shared by every flow
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    jwt_secret: String,
    token_ttl: Duration,
    password_min_length: usize,
}

impl AccountPolicy {
    /// Policy with a 24 hour token lifetime and a 6 character minimum
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            password_min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_password_min_length(mut self, min_length: usize) -> Self {
        self.password_min_length = min_length;
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn password_min_length(&self) -> usize {
        self.password_min_length
    }

    /// Signs a token for the given principal
    pub fn issue_token(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
    ) -> Result<String, JwtError> {
        let claims = Claims::with_expiration(user_id, username, role, self.token_ttl)?;
        create_token(&claims, &self.jwt_secret)
    }
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful user login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

/// Successful admin login
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

fn required(field: &'static str, value: &str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::Validation {
            field,
            message: format!("{} is required", field),
        });
    }
    Ok(value.to_string())
}

/// Registers a new user
///
/// Username and email are trimmed. Email conflicts are reported before
/// username conflicts.
///
/// # Errors
///
/// - `Validation` for a blank username or email, a malformed email, or a
///   password shorter than the policy minimum
/// - `Conflict` if the email or username is taken
pub async fn register(
    store: &Store,
    policy: &AccountPolicy,
    input: Registration,
) -> Result<User, AccountError> {
    let username = required("username", &input.username)?;
    let email = required("email", &input.email)?;
    if !email.validate_email() {
        return Err(AccountError::Validation {
            field: "email",
            message: "Invalid email format".to_string(),
        });
    }
    validate_password_policy(&input.password, policy.password_min_length).map_err(|message| {
        AccountError::Validation {
            field: "password",
            message,
        }
    })?;

    // Fail fast before paying for the hash; the store re-checks under its lock
    if store.find_user_by_email(&email).await.is_some() {
        return Err(AccountError::Conflict("Email already registered".to_string()));
    }
    if store.find_user_by_username(&username).await.is_some() {
        return Err(AccountError::Conflict("Username already taken".to_string()));
    }

    let password_hash = hash_password(&input.password)?;

    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Logs a user in by email and password
///
/// # Errors
///
/// `InvalidCredentials` for an unknown email or a wrong password.
pub async fn login(
    store: &Store,
    policy: &AccountPolicy,
    email: &str,
    password: &str,
) -> Result<Session, AccountError> {
    let Some(user) = store.find_user_by_email(email.trim()).await else {
        tracing::debug!("Login for unknown email");
        verify_dummy_password(password);
        return Err(AccountError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(AccountError::InvalidCredentials);
    }

    let token = policy.issue_token(user.id, &user.username, Role::User)?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Session {
        token,
        user: PublicUser::from(&user),
    })
}

/// Logs a configured administrator in
///
/// # Errors
///
/// `InvalidCredentials` for an unknown admin or a wrong password.
pub fn admin_login(
    admins: &AdminDirectory,
    policy: &AccountPolicy,
    username: &str,
    password: &str,
) -> Result<AdminSession, AccountError> {
    let account = admins
        .authenticate(username.trim(), password)?
        .ok_or(AccountError::InvalidCredentials)?;

    let token = policy.issue_token(ADMIN_USER_ID, &account.username, Role::Admin)?;

    tracing::info!(username = %account.username, "Admin logged in");
    Ok(AdminSession {
        token,
        user_id: ADMIN_USER_ID,
        username: account.username,
        role: Role::Admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_token;
    use crate::store::backend::MemoryBackend;
    use std::sync::Arc;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    async fn store() -> Store {
        Store::open(Arc::new(MemoryBackend::new())).await
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET);

        let cases = [
            (registration(" ", "a@example.com", "secret1"), "username"),
            (registration("alice", "", "secret1"), "email"),
            (registration("alice", "not-an-email", "secret1"), "email"),
            (registration("alice", "a@example.com", "12345"), "password"),
        ];

        for (input, expected) in cases {
            match register(&store, &policy, input).await {
                Err(AccountError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error on {}, got {:?}", expected, other),
            }
        }
        assert_eq!(store.read(|s| s.users.len()).await, 0);
    }

    #[tokio::test]
    async fn test_register_respects_configured_minimum() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET).with_password_min_length(10);

        let err = register(&store, &policy, registration("alice", "a@example.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn test_register_trims_and_hashes() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET);

        let user = register(
            &store,
            &policy,
            registration("  alice ", " alice@example.com ", "secret1"),
        )
        .await
        .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_conflicts_email_first() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET);
        register(&store, &policy, registration("alice", "alice@example.com", "secret1"))
            .await
            .unwrap();

        let both = register(&store, &policy, registration("alice", "alice@example.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(both, AccountError::Conflict(ref m) if m.contains("Email")));

        let name = register(&store, &policy, registration("alice", "other@example.com", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(name, AccountError::Conflict(ref m) if m.contains("Username")));
    }

    #[tokio::test]
    async fn test_login_issues_user_token() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET);
        let user = register(&store, &policy, registration("bob", "bob@example.com", "secret1"))
            .await
            .unwrap();

        let session = login(&store, &policy, "bob@example.com", "secret1").await.unwrap();

        assert_eq!(session.user.id, user.id);
        let claims = validate_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = store().await;
        let policy = AccountPolicy::new(SECRET);
        register(&store, &policy, registration("bob", "bob@example.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = login(&store, &policy, "bob@example.com", "nope").await.unwrap_err();
        let unknown_email = login(&store, &policy, "eve@example.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unknown_email, AccountError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn test_admin_login() {
        let admins = AdminDirectory::from_credentials([("root", "hunter22")]).unwrap();
        let policy = AccountPolicy::new(SECRET);

        let session = admin_login(&admins, &policy, "root", "hunter22").unwrap();
        assert_eq!(session.user_id, 0);
        assert_eq!(session.role, Role::Admin);

        let claims = validate_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), ADMIN_USER_ID);
        assert_eq!(claims.role, Role::Admin);

        assert!(matches!(
            admin_login(&admins, &policy, "root", "wrong"),
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            admin_login(&admins, &policy, "alice", "hunter22"),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: AccountError = StoreError::Conflict("Username already taken".to_string()).into();
        assert!(matches!(err, AccountError::Conflict(_)));

        let err: AccountError = StoreError::NotFound.into();
        assert!(matches!(err, AccountError::Store(StoreError::NotFound)));
    }
}
