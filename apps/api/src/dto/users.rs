use serde::{Deserialize, Serialize};
use tessera_domain::User;
use uuid::Uuid;

/// Incoming payload for user creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub password: String,
    pub legacy_role: Option<String>,
}

/// Incoming payload for a partial user update.
///
/// `display_name` and `legacy_role` distinguish "absent" from "clear":
/// omitting the field keeps the current value, sending `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, with = "double_option")]
    pub display_name: Option<Option<String>>,
    pub email: Option<String>,
    #[serde(default, with = "double_option")]
    pub legacy_role: Option<Option<String>>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

/// User record as exposed over the API. The password hash never leaves the
/// server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub legacy_role: Option<String>,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.as_uuid(),
            username: String::from(user.username),
            display_name: user.display_name,
            email: String::from(user.email),
            legacy_role: user.legacy_role,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
