/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the length policy
/// - [`jwt`]: JWT token generation and validation
/// - [`context`]: the per-request principal and its role
/// - [`authorization`]: admin-tier checks
/// - [`admin`]: configured administrator accounts
/// - [`accounts`]: registration, login and admin login
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Uniform Login Failures**: unknown account and wrong password look the same
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::context::Role;
/// use tasklane_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tasklane_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(1, "alice", Role::User), "secret-key")?;
/// assert_eq!(validate_token(&token, "secret-key")?.username, "alice");
/// # Ok(())
/// # }
/// ```

pub mod accounts;
pub mod admin;
pub mod authorization;
pub mod context;
pub mod jwt;
pub mod password;
