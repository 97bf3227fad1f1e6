//! User entity and validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maximum accepted username length.
pub const USERNAME_MAX_LENGTH: usize = 64;

/// Validated login name.
///
/// Usernames are trimmed, case-preserving, and limited to ASCII letters,
/// digits, `.`, `_`, and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Creates a validated username.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation("username must not be empty".to_owned()));
        }

        if trimmed.chars().count() > USERNAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "username must not exceed {USERNAME_MAX_LENGTH} characters"
            )));
        }

        let valid = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if !valid {
            return Err(AppError::Validation(
                "username may only contain letters, digits, '.', '_' and '-'".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated username string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs structural validation only: non-empty, exactly one `@`,
    /// non-empty local part, domain with at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 || parts[1].contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum accepted password length.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Maximum accepted password length (protects the hasher from oversized input).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password before hashing.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    Ok(())
}

/// User record as persisted in the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Unique email address.
    pub email: EmailAddress,
    /// Password hash in PHC string format.
    pub password_hash: String,
    /// Legacy single-role field consulted only when no role links exist.
    pub legacy_role: Option<String>,
    /// Soft activation flag; inactive users cannot authenticate.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Creating actor, when known.
    pub created_by: Option<UserId>,
    /// Last updating actor, when known.
    pub updated_by: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{EmailAddress, Username, validate_password};

    #[test]
    fn username_rejects_spaces_inside() {
        assert!(Username::new("ann smith").is_err());
    }

    #[test]
    fn username_trims_surrounding_whitespace() {
        let username = Username::new("  bruno  ");
        assert_eq!(username.ok().map(String::from).as_deref(), Some("bruno"));
    }

    #[test]
    fn email_is_normalized_to_lowercase() {
        let email = EmailAddress::new("Ops@Example.COM");
        assert_eq!(
            email.ok().map(String::from).as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn email_requires_dotted_domain() {
        assert!(EmailAddress::new("ops@localhost").is_err());
    }

    #[test]
    fn password_length_bounds_are_enforced() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    proptest! {
        #[test]
        fn valid_usernames_round_trip(name in "[A-Za-z0-9._-]{1,64}") {
            let parsed = Username::new(name.clone());
            prop_assert_eq!(parsed.ok().map(String::from), Some(name));
        }

        #[test]
        fn usernames_never_keep_outer_whitespace(name in "[A-Za-z0-9._-]{1,32}") {
            let padded = format!("  {name} ");
            let parsed = Username::new(padded);
            prop_assert_eq!(parsed.ok().map(String::from), Some(name));
        }
    }
}
