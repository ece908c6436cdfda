use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    claims::TokenPair,
    cookies::{cookie_value, ACCESS_COOKIE, OAUTH_REDIRECT_COOKIE, OAUTH_STATE_COOKIE, REFRESH_COOKIE},
    dto::{
        AccessResponse, AuthorizationUrlResponse, LoginRequest, ProviderAuthResponse,
        ProviderBeginQuery, ProviderCallbackQuery, PublicUser, RefreshRequest, VerifyRequest,
    },
    extractors::AuthUser,
    services::SessionManager,
};
use crate::{body::parse_optional_json, error::ApiError, state::AppState};

pub fn jwt_routes() -> Router<AppState> {
    Router::new()
        .route("/jwt/create/", post(create_token))
        .route("/jwt/refresh/", post(refresh_token))
        .route("/jwt/verify/", post(verify_token))
        .route("/logout/", post(logout))
}

pub fn provider_routes() -> Router<AppState> {
    Router::new().route("/o/:provider/", get(provider_begin).post(provider_auth))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me/", get(get_me))
}

#[instrument(skip_all)]
pub async fn create_token(
    State(manager): State<SessionManager>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<TokenPair>), ApiError> {
    let payload: LoginRequest = parse_optional_json(&body)?;
    let session = manager
        .create_session(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    let jar = manager.cookies().with_session(jar, &session.tokens);
    Ok((jar, Json(session.tokens)))
}

#[instrument(skip_all)]
pub async fn refresh_token(
    State(manager): State<SessionManager>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<AccessResponse>), ApiError> {
    let payload: RefreshRequest = parse_optional_json(&body)?;
    let access = manager.refresh_session(cookie_value(&jar, REFRESH_COOKIE), payload.refresh)?;
    let jar = manager.cookies().with_access(jar, &access);
    Ok((jar, Json(AccessResponse { access })))
}

#[instrument(skip_all)]
pub async fn verify_token(
    State(manager): State<SessionManager>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let payload: VerifyRequest = parse_optional_json(&body)?;
    manager.verify_session(cookie_value(&jar, ACCESS_COOKIE), payload.token)?;
    Ok(Json(json!({})))
}

/// Client-side revocation only: issued tokens stay valid until they expire.
#[instrument(skip_all)]
pub async fn logout(
    State(manager): State<SessionManager>,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    info!("session cookies cleared");
    (StatusCode::NO_CONTENT, manager.cookies().expire_session(jar))
}

#[instrument(skip(manager, jar))]
pub async fn provider_begin(
    State(manager): State<SessionManager>,
    Path(provider): Path<String>,
    Query(query): Query<ProviderBeginQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthorizationUrlResponse>), ApiError> {
    let redirect = manager.begin_provider_auth(&provider, query.redirect_uri.as_deref())?;
    let jar = manager
        .cookies()
        .with_oauth_state(jar, &redirect.state, &redirect.redirect_uri);
    Ok((
        jar,
        Json(AuthorizationUrlResponse {
            authorization_url: redirect.authorization_url,
        }),
    ))
}

#[instrument(skip(manager, query, jar))]
pub async fn provider_auth(
    State(manager): State<SessionManager>,
    Path(provider): Path<String>,
    Query(query): Query<ProviderCallbackQuery>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar, Json<ProviderAuthResponse>), ApiError> {
    let expected_state = cookie_value(&jar, OAUTH_STATE_COOKIE);
    let redirect_uri = cookie_value(&jar, OAUTH_REDIRECT_COOKIE);
    let session = manager
        .provider_auth(
            &provider,
            query.code.as_deref(),
            query.state.as_deref(),
            expected_state.as_deref(),
            redirect_uri.as_deref(),
        )
        .await?;

    let jar = manager.cookies().expire_oauth_state(jar);
    let jar = manager.cookies().with_session(jar, &session.tokens);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(ProviderAuthResponse {
            access: session.tokens.access,
            refresh: session.tokens.refresh,
            user: session.user.email,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Method};
    use time::Duration;

    use crate::{
        auth::oauth::fake::{FakeProvider, FAKE_GOOD_CODE, FAKE_REDIRECT},
        test_support::{cookie_named, empty_request, json_request, seed_user, send, TestApp},
    };

    use super::*;

    async fn login(app: &TestApp) -> (String, String) {
        let res = send(
            app,
            json_request(
                Method::POST,
                "/jwt/create/",
                json!({ "email": "test@example.com", "password": "password123" }),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let access = cookie_named(&res.cookies, ACCESS_COOKIE).expect("access cookie");
        let refresh = cookie_named(&res.cookies, REFRESH_COOKIE).expect("refresh cookie");
        (access.value().to_string(), refresh.value().to_string())
    }

    #[tokio::test]
    async fn token_obtain_sets_cookies() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;

        let res = send(
            &app,
            json_request(
                Method::POST,
                "/jwt/create/",
                json!({ "email": "Test@Example.com", "password": "password123" }),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            let cookie = cookie_named(&res.cookies, name).expect("cookie set");
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.max_age(), Some(Duration::seconds(86_400)));
            assert_eq!(res.body[name], cookie.value());
        }
    }

    #[tokio::test]
    async fn token_obtain_rejects_bad_credentials() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;

        let res = send(
            &app,
            json_request(
                Method::POST,
                "/jwt/create/",
                json!({ "email": "test@example.com", "password": "nope" }),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert!(res.cookies.is_empty());

        let res = send(
            &app,
            json_request(Method::POST, "/jwt/create/", json!({ "email": "test@example.com" })),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["password"][0], "This field is required.");
        assert!(res.body.get("email").is_none());

        let res = send(&app, empty_request(Method::POST, "/jwt/create/", None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["email"][0], "This field is required.");
        assert_eq!(res.body["password"][0], "This field is required.");
    }

    #[tokio::test]
    async fn token_refresh_from_cookie_without_body() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;
        let (_, refresh) = login(&app).await;

        let res = send(
            &app,
            empty_request(Method::POST, "/jwt/refresh/", Some(&format!("refresh={refresh}"))),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let access = cookie_named(&res.cookies, ACCESS_COOKIE).expect("new access cookie");
        assert_eq!(res.body["access"], access.value());
        assert!(cookie_named(&res.cookies, REFRESH_COOKIE).is_none());
    }

    #[tokio::test]
    async fn token_refresh_requires_a_valid_refresh_token() {
        let app = TestApp::new();
        let res = send(&app, empty_request(Method::POST, "/jwt/refresh/", None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["refresh"][0], "This field is required.");

        let res = send(
            &app,
            empty_request(Method::POST, "/jwt/refresh/", Some("refresh=not-a-jwt")),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], "token_not_valid");
    }

    #[tokio::test]
    async fn token_verify_from_cookie() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;
        let (access, _) = login(&app).await;

        let res = send(
            &app,
            empty_request(Method::POST, "/jwt/verify/", Some(&format!("access={access}"))),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.cookies.is_empty());

        let res = send(
            &app,
            json_request(Method::POST, "/jwt/verify/", json!({ "token": "forged" })),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_after_login_clears_cookies() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;
        let (access, refresh) = login(&app).await;

        let res = send(
            &app,
            empty_request(
                Method::POST,
                "/logout/",
                Some(&format!("access={access}; refresh={refresh}")),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            let cookie = cookie_named(&res.cookies, name).expect("cleared cookie");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.value(), "");
        }

        // works without any cookies too
        let res = send(&app, empty_request(Method::POST, "/logout/", None)).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(res.cookies.len(), 2);
    }

    #[tokio::test]
    async fn me_accepts_cookie_or_bearer() {
        let app = TestApp::new();
        seed_user(app.state.users.as_ref(), "test@example.com", "password123").await;
        let (access, _) = login(&app).await;

        let res = send(
            &app,
            empty_request(Method::GET, "/users/me/", Some(&format!("access={access}"))),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["email"], "test@example.com");

        let mut req = empty_request(Method::GET, "/users/me/", None);
        req.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {access}").parse().unwrap(),
        );
        let res = send(&app, req).await;
        assert_eq!(res.status, StatusCode::OK);

        let res = send(&app, empty_request(Method::GET, "/users/me/", None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn provider_flow_sets_session_cookies_on_success() {
        let app = TestApp::new();
        let begin = send(
            &app,
            empty_request(
                Method::GET,
                &format!("/o/{}/?redirect_uri={}", FakeProvider::NAME, FAKE_REDIRECT),
                None,
            ),
        )
        .await;
        assert_eq!(begin.status, StatusCode::OK);
        let state = cookie_named(&begin.cookies, OAUTH_STATE_COOKIE).expect("state cookie");
        let redirect = cookie_named(&begin.cookies, OAUTH_REDIRECT_COOKIE).expect("redirect cookie");
        assert!(begin.body["authorization_url"]
            .as_str()
            .unwrap()
            .contains(state.value()));

        let cookie_header = format!(
            "{}={}; {}={}",
            OAUTH_STATE_COOKIE,
            state.value(),
            OAUTH_REDIRECT_COOKIE,
            redirect.value()
        );
        let res = send(
            &app,
            empty_request(
                Method::POST,
                &format!("/o/{}/?code={}&state={}", FakeProvider::NAME, FAKE_GOOD_CODE, state.value()),
                Some(&cookie_header),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["user"], "pilot@example.com");
        assert!(cookie_named(&res.cookies, ACCESS_COOKIE).is_some());
        assert!(cookie_named(&res.cookies, REFRESH_COOKIE).is_some());
        let cleared = cookie_named(&res.cookies, OAUTH_STATE_COOKIE).expect("state cleared");
        assert_eq!(cleared.max_age(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn provider_failures_pass_through_without_cookies() {
        let app = TestApp::new();
        let res = send(
            &app,
            empty_request(
                Method::POST,
                &format!("/o/{}/?code={}&state=abc", FakeProvider::NAME, FAKE_GOOD_CODE),
                Some(&format!("{OAUTH_STATE_COOKIE}=xyz; {OAUTH_REDIRECT_COOKIE}={FAKE_REDIRECT}")),
            ),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert!(res.body["non_field_errors"].is_array());
        assert!(res.cookies.is_empty());

        let res = send(
            &app,
            empty_request(Method::POST, "/o/myspace/?code=a&state=b", None),
        )
        .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert!(res.cookies.is_empty());
    }
}
