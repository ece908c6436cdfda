use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for `/jwt/create/`. Fields are optional so a missing one
/// reports as "field required" rather than a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `/jwt/refresh/`; the `refresh` cookie overrides it.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Request body for `/jwt/verify/`; the `access` cookie overrides it.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Query of `GET /o/{provider}/`.
#[derive(Debug, Deserialize)]
pub struct ProviderBeginQuery {
    pub redirect_uri: Option<String>,
}

/// Query of `POST /o/{provider}/`.
#[derive(Debug, Deserialize)]
pub struct ProviderCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizationUrlResponse {
    pub authorization_url: String,
}

#[derive(Debug, Serialize)]
pub struct ProviderAuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}
