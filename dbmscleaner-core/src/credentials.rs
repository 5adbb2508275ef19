//! Credential container with automatic memory zeroing.
//!
//! Passwords loaded from the configuration file (or from the environment
//! variable it names) live in `Zeroizing` buffers and are cleared on drop.

use zeroize::{Zeroize, Zeroizing};

/// Database credentials that zero their memory on drop.
///
/// # Example
///
/// ```rust
/// use dbmscleaner_core::credentials::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), "secret".to_string());
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Gets the password for handing to a driver.
    ///
    /// Callers must not log the returned value.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Checks if a non-empty password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &if self.has_password() { "****" } else { "" })
            .finish()
    }
}
