//! Form login, logout and the welcome page

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::collections::HashMap;
use tracing::{debug, info};
use ums_auth::{AuthError, CurrentUser};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{LoginForm, MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH};

const LOGIN_SUCCESS_URL: &str = "/";
const LOGIN_FAILURE_URL: &str = "/login?error";
const LOGOUT_SUCCESS_URL: &str = "/login?logout";

/// `302 Found` redirect, optionally setting a cookie
fn found(location: &str, cookie: Option<String>) -> Result<Response, ApiError> {
    let mut response = (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response();
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::Internal(format!("invalid cookie header: {}", e)))?;
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn login_page(notice: Option<&str>) -> String {
    let notice = notice
        .map(|n| format!("<p class=\"notice\">{}</p>\n", n))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Please sign in</title></head>
<body>
<h2>Please sign in</h2>
{notice}<form method="post" action="/login">
<p><label for="username">Username</label> <input type="text" id="username" name="username" autofocus></p>
<p><label for="password">Password</label> <input type="password" id="password" name="password"></p>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#
    )
}

/// GET /login
///
/// `?error` and `?logout` are flags without values.
async fn show_login(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let notice = if params.contains_key("error") {
        Some("Invalid username and password.")
    } else if params.contains_key("logout") {
        Some("You have been signed out.")
    } else {
        None
    };
    Html(login_page(notice))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if form.username.is_empty()
        || form.username.len() > MAX_USERNAME_LENGTH
        || form.password.len() > MAX_PASSWORD_LENGTH
    {
        debug!("Rejected malformed login form");
        return found(LOGIN_FAILURE_URL, None);
    }

    let user = match state.auth.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => return found(LOGIN_FAILURE_URL, None),
        Err(e) => return Err(e.into()),
    };

    // A fresh token on every login; any session presented with the form is dropped
    if let Some(previous) = state.sessions.token_from_headers(&headers) {
        state.sessions.invalidate(&previous).await?;
    }

    let session = state.sessions.create(&user).await?;
    info!("User {} logged in", user.username);

    found(LOGIN_SUCCESS_URL, Some(state.sessions.session_cookie(&session.id)))
}

/// GET|POST /logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = state.sessions.token_from_headers(&headers)
        && state.sessions.invalidate(&token).await?
    {
        info!("Session closed");
    }

    found(LOGOUT_SUCCESS_URL, Some(state.sessions.clear_cookie()))
}

/// GET /
async fn welcome(user: CurrentUser) -> Html<String> {
    let roles = if user.roles.is_empty() {
        "none".to_string()
    } else {
        user.roles
            .iter()
            .map(|r| escape_html(r))
            .collect::<Vec<_>>()
            .join(", ")
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Welcome</title></head>
<body>
<h2>Welcome, {}</h2>
<p>Roles: {}</p>
<form method="post" action="/logout"><button type="submit">Sign out</button></form>
</body>
</html>
"#,
        escape_html(&user.username),
        roles
    ))
}

/// Create login routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/login", get(show_login).post(login))
        .route("/logout", get(logout).post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_login_page_notice() {
        assert!(login_page(Some("You have been signed out.")).contains("You have been signed out."));
        assert!(!login_page(None).contains("class=\"notice\""));
    }
}
