//! Registration and login.

use axum::{Json, body::Bytes, extract::State};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::parse_json;
use crate::gateway::GatewayError;
use crate::server::{AppState, SessionCookie};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    fn parse(body: &[u8]) -> Result<Self, GatewayError> {
        let credentials: Self = parse_json(body)?;
        if credentials.login.trim().is_empty() {
            return Err(GatewayError::BadRequest("login must not be empty".into()));
        }
        Ok(credentials)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RegisterResponse>, GatewayError> {
    let credentials = Credentials::parse(&body)?;
    let registration = state
        .auth
        .register(&credentials.login, &credentials.password)
        .await?;

    Ok(Json(RegisterResponse {
        id: registration.id.to_string(),
    }))
}

/// `POST /api/login`
///
/// On success the token is returned in the body and set as an http-only
/// session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<LoginResponse>), GatewayError> {
    let credentials = Credentials::parse(&body)?;
    let issued = match state
        .auth
        .login(&credentials.login, &credentials.password)
        .await
    {
        Ok(issued) => issued,
        Err(e) => {
            tracing::info!(login = %credentials.login, reason = %e, "Login failed");
            return Err(e.into());
        }
    };

    let cookie = session_cookie(&state.session_cookie, issued.token.clone());
    Ok((jar.add(cookie), Json(LoginResponse { token: issued.token })))
}

fn session_cookie(settings: &SessionCookie, token: String) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(false)
        .expires(OffsetDateTime::now_utc() + settings.ttl)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let settings = SessionCookie {
            name: "jwt".into(),
            ttl: time::Duration::hours(1),
        };
        let before = OffsetDateTime::now_utc();
        let cookie = session_cookie(&settings, "abc".into());

        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));

        let expires = cookie.expires_datetime().unwrap();
        let ttl = expires - before;
        assert!(ttl > time::Duration::minutes(59) && ttl <= time::Duration::minutes(61));
    }

    #[test]
    fn test_credentials_require_login() {
        assert!(Credentials::parse(br#"{"login":"flip","password":"flop"}"#).is_ok());
        assert!(Credentials::parse(br#"{"login":"  ","password":"flop"}"#).is_err());
        assert!(Credentials::parse(br#"{"login":"flip"}"#).is_err());
    }
}
