use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{
    claims::{TokenKind, TokenPair},
    jwt::JwtKeys,
    oauth::{random_state, ProviderRegistry},
    password::{hash_password, is_valid_email, normalize_email, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::{
    config::{CookieConfig, SuperuserConfig},
    error::ApiError,
    state::AppState,
};

/// Owns the session lifecycle: credentials in, token pair out, plus the
/// cookie attributes the handlers apply to whatever it issues.
#[derive(Clone)]
pub struct SessionManager {
    keys: JwtKeys,
    cookies: CookieConfig,
    users: Arc<dyn UserStore>,
    providers: Arc<ProviderRegistry>,
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.keys.clone(),
            state.config.cookies.clone(),
            state.users.clone(),
            state.providers.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub tokens: TokenPair,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct ProviderRedirect {
    pub authorization_url: String,
    pub state: String,
    pub redirect_uri: String,
}

fn provider_rejected(message: &str) -> ApiError {
    ApiError::Passthrough(
        StatusCode::BAD_REQUEST,
        json!({ "non_field_errors": [message] }),
    )
}

fn first_present(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    preferred
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.filter(|v| !v.is_empty()))
}

impl SessionManager {
    pub fn new(
        keys: JwtKeys,
        cookies: CookieConfig,
        users: Arc<dyn UserStore>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            keys,
            cookies,
            users,
            providers,
        }
    }

    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    fn issue(&self, user: User) -> Result<IssuedSession, ApiError> {
        let tokens = self.keys.sign_pair(user.id)?;
        Ok(IssuedSession { tokens, user })
    }

    /// Anonymous -> Authenticated.
    #[instrument(skip(self, password))]
    pub async fn create_session(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<IssuedSession, ApiError> {
        let email = email.map(normalize_email).filter(|e| !e.is_empty());
        let password = password.filter(|p| !p.is_empty());
        let (email, password) = match (email, password) {
            (Some(email), Some(password)) => (email, password),
            (email, password) => {
                let mut missing = Vec::new();
                if email.is_none() {
                    missing.push("email");
                }
                if password.is_none() {
                    missing.push("password");
                }
                return Err(ApiError::FieldRequired(missing));
            }
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(%email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        };
        if !verify_password(password, user.password_hash.as_deref())? {
            warn!(%email, user_id = user.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = user.id, %email, "session created");
        self.issue(user)
    }

    /// Authenticated -> Refreshed. The cookie wins over the body value; the
    /// refresh token itself is not rotated.
    pub fn refresh_session(
        &self,
        cookie: Option<String>,
        body: Option<String>,
    ) -> Result<String, ApiError> {
        let token = first_present(cookie, body)
            .ok_or_else(|| ApiError::FieldRequired(vec!["refresh"]))?;
        let claims = self
            .keys
            .verify_kind(&token, TokenKind::Refresh)
            .map_err(|e| {
                debug!(error = %e, "refresh rejected");
                ApiError::TokenInvalid
            })?;
        let access = self.keys.sign_access(claims.user_id)?;
        info!(user_id = claims.user_id, "access token refreshed");
        Ok(access)
    }

    /// Pure signature and expiry check. The cookie wins over the body value.
    pub fn verify_session(
        &self,
        cookie: Option<String>,
        body: Option<String>,
    ) -> Result<(), ApiError> {
        let token = first_present(cookie, body)
            .ok_or_else(|| ApiError::FieldRequired(vec!["token"]))?;
        self.keys.verify(&token).map(|_| ()).map_err(|e| {
            debug!(error = %e, "verify rejected");
            ApiError::TokenInvalid
        })
    }

    /// First leg of federated login: where to send the browser.
    pub fn begin_provider_auth(
        &self,
        provider: &str,
        redirect_uri: Option<&str>,
    ) -> Result<ProviderRedirect, ApiError> {
        let handler = self
            .providers
            .get(provider)
            .ok_or_else(|| ApiError::passthrough(StatusCode::NOT_FOUND, "Not found."))?;
        let redirect_uri = redirect_uri
            .filter(|uri| self.providers.is_allowed_redirect(uri))
            .ok_or_else(|| {
                ApiError::passthrough(
                    StatusCode::BAD_REQUEST,
                    "redirect_uri must be in SOCIAL_AUTH_ALLOWED_REDIRECT_URIS",
                )
            })?;

        let state = random_state();
        let authorization_url = handler.authorization_url(redirect_uri, &state)?;
        Ok(ProviderRedirect {
            authorization_url,
            state,
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Second leg of federated login. `expected_state` and `redirect_uri`
    /// come from the cookies written by [`Self::begin_provider_auth`].
    #[instrument(skip(self, code, state, expected_state))]
    pub async fn provider_auth(
        &self,
        provider: &str,
        code: Option<&str>,
        state: Option<&str>,
        expected_state: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Result<IssuedSession, ApiError> {
        let handler = self
            .providers
            .get(provider)
            .ok_or_else(|| ApiError::passthrough(StatusCode::NOT_FOUND, "Not found."))?;
        let (Some(code), Some(state)) = (code, state) else {
            return Err(provider_rejected("Both code and state are required."));
        };
        let (Some(expected), Some(redirect_uri)) = (expected_state, redirect_uri) else {
            return Err(provider_rejected(
                "State could not be found in server-side session data.",
            ));
        };
        if state != expected {
            warn!(provider, "oauth state mismatch");
            return Err(provider_rejected("State parameter does not match."));
        }

        let profile = handler
            .exchange_code(code, redirect_uri)
            .await
            .map_err(|e| {
                warn!(provider, error = %format!("{e:#}"), "oauth code exchange failed");
                provider_rejected("Failed to authenticate with the provider.")
            })?;

        let (user, created) = self
            .users
            .get_or_create(NewUser {
                email: normalize_email(&profile.email),
                password_hash: None,
                first_name: profile.first_name,
                last_name: profile.last_name,
                is_staff: false,
                is_superuser: false,
            })
            .await?;
        info!(provider, user_id = user.id, created, "federated login");
        self.issue(user)
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Users must have an email address")]
    MissingEmail,
    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),
    #[error("a user with email {0} already exists")]
    EmailTaken(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct UserDraft {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
pub async fn create_user(users: &dyn UserStore, draft: UserDraft) -> Result<User, UserError> {
    insert_user(users, draft, false).await
}

pub async fn create_superuser(users: &dyn UserStore, draft: UserDraft) -> Result<User, UserError> {
    insert_user(users, draft, true).await
}

async fn insert_user(
    users: &dyn UserStore,
    draft: UserDraft,
    elevated: bool,
) -> Result<User, UserError> {
    let email = draft
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or(UserError::MissingEmail)?;
    if !is_valid_email(&email) {
        return Err(UserError::InvalidEmail(email));
    }
    if users.find_by_email(&email).await?.is_some() {
        return Err(UserError::EmailTaken(email));
    }
    let password_hash = draft.password.as_deref().map(hash_password).transpose()?;

    let user = users
        .create(NewUser {
            email,
            password_hash,
            first_name: draft.first_name,
            last_name: draft.last_name,
            is_staff: elevated,
            is_superuser: elevated,
        })
        .await?;
    info!(user_id = user.id, email = %user.email, is_superuser = elevated, "user created");
    Ok(user)
}

/// Creates the configured superuser unless the email is already taken.
pub async fn ensure_superuser(
    users: &dyn UserStore,
    cfg: &SuperuserConfig,
) -> Result<Option<User>, UserError> {
    if users
        .find_by_email(&normalize_email(&cfg.email))
        .await?
        .is_some()
    {
        debug!(email = %cfg.email, "superuser already present");
        return Ok(None);
    }
    let user = create_superuser(
        users,
        UserDraft {
            email: Some(cfg.email.clone()),
            password: Some(cfg.password.clone()),
            ..UserDraft::default()
        },
    )
    .await?;
    Ok(Some(user))
}
