use anyhow::Context;
use serde::Deserialize;

const DEV_JWT_SECRET: &str = "Zero Gravity, Maximum Adventure: not for production use";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Ci,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "ci" => Ok(Self::Ci),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown ENVIRONMENT {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl SameSitePolicy {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => anyhow::bail!("unknown AUTH_COOKIE_SAMESITE {other:?}"),
        }
    }
}

/// Attributes shared by every cookie the auth layer emits. Cookies are always httponly.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub secure: bool,
    pub max_age_secs: i64,
    pub path: String,
    pub domain: Option<String>,
    pub same_site: SameSitePolicy,
}

impl CookieConfig {
    /// `Secure` everywhere except local development, unless explicitly overridden.
    pub fn secure_for(environment: Environment, explicit: Option<bool>) -> bool {
        explicit.unwrap_or(environment != Environment::Development)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfig {
    pub google: Option<GoogleOAuthConfig>,
    pub allowed_redirect_uris: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperuserConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookies: CookieConfig,
    pub oauth: OAuthConfig,
    pub superuser: Option<SuperuserConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = match std::env::var("ENVIRONMENT") {
            Ok(raw) => Environment::parse(&raw)?,
            Err(_) => Environment::Development,
        };
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = match (std::env::var("JWT_SECRET"), environment) {
            (Ok(secret), _) if !secret.is_empty() => secret,
            (_, Environment::Production) => {
                anyhow::bail!("JWT_SECRET must be set in production")
            }
            _ => {
                tracing::warn!("JWT_SECRET not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cosmic-tracer".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cosmic-tracer-players".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 5),
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24),
        };

        let same_site = match std::env::var("AUTH_COOKIE_SAMESITE") {
            Ok(raw) => SameSitePolicy::parse(&raw)?,
            Err(_) => SameSitePolicy::None,
        };
        let cookies = CookieConfig {
            secure: CookieConfig::secure_for(
                environment,
                std::env::var("AUTH_COOKIE_SECURE")
                    .ok()
                    .and_then(|v| v.trim().parse::<bool>().ok()),
            ),
            max_age_secs: parse_or("AUTH_COOKIE_MAX_AGE", 60 * 60 * 24),
            path: std::env::var("AUTH_COOKIE_PATH").unwrap_or_else(|_| "/".into()),
            domain: std::env::var("AUTH_COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
            same_site,
        };

        let google = match (
            std::env::var("GOOGLE_OAUTH2_KEY"),
            std::env::var("GOOGLE_OAUTH2_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(GoogleOAuthConfig {
                    client_id,
                    client_secret,
                })
            }
            _ => None,
        };
        let oauth = OAuthConfig {
            google,
            allowed_redirect_uris: split_env(
                &std::env::var("SOCIAL_AUTH_ALLOWED_REDIRECT_URIS").unwrap_or_default(),
            ),
        };

        let superuser = match (
            std::env::var("AUTH_SUPERUSER_EMAIL"),
            std::env::var("AUTH_SUPERUSER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(SuperuserConfig { email, password })
            }
            _ => None,
        };

        Ok(Self {
            environment,
            database_url,
            jwt,
            cookies,
            oauth,
            superuser,
        })
    }
}

fn parse_or(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn split_env(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
