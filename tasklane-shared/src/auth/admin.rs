/// Configured administrator accounts
///
/// Admins are not users: they have no row in the store, are supplied at
/// startup, and all share user ID [`ADMIN_USER_ID`]. Their passwords are held
/// only as Argon2id hashes; plaintext given at startup is hashed once and
/// dropped.
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::admin::AdminDirectory;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let admins = AdminDirectory::from_credentials([("root", "hunter22")])?;
///
/// assert!(admins.authenticate("root", "hunter22")?.is_some());
/// assert!(admins.authenticate("root", "nope")?.is_none());
/// # Ok(())
/// # }
/// ```

use std::collections::BTreeMap;

use super::password::{
    hash_password, is_password_hash, verify_dummy_password, verify_password, PasswordError,
};

/// User ID carried by every admin token
pub const ADMIN_USER_ID: i64 = 0;

/// An administrator that passed authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
}

/// Username to password hash map for administrators
#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    accounts: BTreeMap<String, String>,
}

impl AdminDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from `(username, secret)` pairs
    ///
    /// A secret that is already an Argon2 PHC hash is kept as-is; anything
    /// else is treated as plaintext and hashed. A repeated username keeps
    /// the last entry.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if hashing fails.
    pub fn from_credentials<I, U, P>(credentials: I) -> Result<Self, PasswordError>
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: AsRef<str>,
    {
        let mut directory = Self::new();
        for (username, secret) in credentials {
            let secret = secret.as_ref();
            let hash = if is_password_hash(secret) {
                secret.to_string()
            } else {
                hash_password(secret)?
            };
            directory.insert_hash(username, hash);
        }
        Ok(directory)
    }

    /// Adds or replaces an admin whose password is already hashed
    pub fn insert_hash(&mut self, username: impl Into<String>, password_hash: impl Into<String>) {
        self.accounts.insert(username.into(), password_hash.into());
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    /// Checks an admin login
    ///
    /// Returns `Ok(None)` for an unknown username or a wrong password, so
    /// callers cannot tell the two apart.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError` only if a stored hash is unusable.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminAccount>, PasswordError> {
        let Some(hash) = self.accounts.get(username) else {
            verify_dummy_password(password);
            return Ok(None);
        };

        if verify_password(password, hash)? {
            Ok(Some(AdminAccount {
                username: username.to_string(),
            }))
        } else {
            Ok(None)
        }
    }
}
