use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{GoogleOAuthConfig, OAuthConfig};

pub const GOOGLE_PROVIDER: &str = "google-oauth2";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const GOOGLE_SCOPES: &str = "https://www.googleapis.com/auth/userinfo.email \
                             https://www.googleapis.com/auth/userinfo.profile openid";

/// Identity returned by a provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> anyhow::Result<String>;
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> anyhow::Result<ProviderProfile>;
}

/// Configured providers keyed by the name used in `/o/{provider}/`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
    allowed_redirect_uris: Vec<String>,
}

impl ProviderRegistry {
    pub fn from_config(cfg: &OAuthConfig, http: reqwest::Client) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            allowed_redirect_uris: cfg.allowed_redirect_uris.clone(),
        };
        if let Some(google) = &cfg.google {
            registry = registry.with_provider(GOOGLE_PROVIDER, GoogleProvider::new(google, http));
        }
        registry
    }

    pub fn with_provider(mut self, name: &str, provider: impl OAuthProvider + 'static) -> Self {
        self.providers.insert(name.to_string(), Arc::new(provider));
        self
    }

    #[cfg(test)]
    pub fn with_allowed_redirect(mut self, uri: &str) -> Self {
        self.allowed_redirect_uris.push(uri.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn is_allowed_redirect(&self, uri: &str) -> bool {
        self.allowed_redirect_uris.iter().any(|allowed| allowed == uri)
    }
}

pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

impl GoogleProvider {
    pub fn new(cfg: &GoogleOAuthConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> anyhow::Result<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("state", state),
                ("response_type", "code"),
                ("scope", GOOGLE_SCOPES),
            ],
        )
        .context("build google authorization url")?;
        Ok(url.to_string())
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> anyhow::Result<ProviderProfile> {
        let token = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("google token request")?
            .error_for_status()
            .context("google token exchange rejected")?
            .json::<GoogleTokenResponse>()
            .await
            .context("decode google token response")?;

        let info = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("google userinfo request")?
            .error_for_status()
            .context("google userinfo rejected")?
            .json::<GoogleUserInfo>()
            .await
            .context("decode google userinfo")?;

        let email = info.email.context("google profile has no email")?;
        if !info.email_verified {
            anyhow::bail!("google email {email} is not verified");
        }
        debug!(%email, "google profile fetched");
        Ok(ProviderProfile {
            email,
            first_name: info.given_name,
            last_name: info.family_name,
        })
    }
}
