use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

use super::claims::TokenPair;
use crate::config::{CookieConfig, SameSitePolicy};

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const OAUTH_REDIRECT_COOKIE: &str = "oauth_redirect_uri";

const OAUTH_COOKIE_MAX_AGE: Duration = Duration::minutes(10);

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

impl CookieConfig {
    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name, value))
            .http_only(true)
            .path(self.path.clone())
            .same_site(self.same_site.into())
            .secure(self.secure)
            .max_age(max_age);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    fn expired(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, String::new(), Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    fn session_max_age(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }

    pub fn with_session(&self, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE, tokens.access.clone(), self.session_max_age()))
            .add(self.cookie(REFRESH_COOKIE, tokens.refresh.clone(), self.session_max_age()))
    }

    pub fn with_access(&self, jar: CookieJar, access: &str) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE, access.to_string(), self.session_max_age()))
    }

    /// Replaces both session cookies with empty, already-expired ones.
    pub fn expire_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.expired(ACCESS_COOKIE))
            .add(self.expired(REFRESH_COOKIE))
    }

    pub fn with_oauth_state(&self, jar: CookieJar, state: &str, redirect_uri: &str) -> CookieJar {
        jar.add(self.cookie(OAUTH_STATE_COOKIE, state.to_string(), OAUTH_COOKIE_MAX_AGE))
            .add(self.cookie(
                OAUTH_REDIRECT_COOKIE,
                redirect_uri.to_string(),
                OAUTH_COOKIE_MAX_AGE,
            ))
    }

    pub fn expire_oauth_state(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.expired(OAUTH_STATE_COOKIE))
            .add(self.expired(OAUTH_REDIRECT_COOKIE))
    }
}

pub fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
