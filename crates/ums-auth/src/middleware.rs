//! Security filter middleware for Axum

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::LOCATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::access::{Access, AccessRules};
use crate::error::AuthError;
use crate::session::SessionManager;
use crate::user_details::{UserDetails, has_role};

/// Authenticated user attached to the request by [`security_filter`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        has_role(&self.roles, role)
    }

    /// Fail with [`AuthError::InsufficientPermissions`] unless the user has `role`
    pub fn require_role(&self, role: &str) -> Result<(), AuthError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

impl From<UserDetails> for CurrentUser {
    fn from(user: UserDetails) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Security filter configuration
pub struct WebSecurity {
    rules: AccessRules,
    sessions: Arc<SessionManager>,
    login_page: String,
}

impl WebSecurity {
    /// Build the filter; the login page and `logout_url` are always public
    pub fn new(
        rules: AccessRules,
        sessions: Arc<SessionManager>,
        login_page: &str,
        logout_url: &str,
    ) -> Self {
        Self {
            rules: rules.permit(login_page).permit(logout_url),
            sessions,
            login_page: login_page.to_string(),
        }
    }

    pub fn rules(&self) -> &AccessRules {
        &self.rules
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn login_page(&self) -> &str {
        &self.login_page
    }
}

/// Security filter
///
/// Resolves the session cookie into a [`CurrentUser`] request extension,
/// then lets the request through if it is authenticated or its path is
/// public. Anything else is redirected to the login page; the original
/// request is not remembered. A failing session lookup only fails the
/// request when the path is protected.
pub async fn security_filter(
    State(security): State<Arc<WebSecurity>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let public = security.rules.is_public(request.uri().path());

    let user = match security.sessions.token_from_headers(request.headers()) {
        Some(token) => match security.sessions.resolve(&token).await {
            Ok(user) => user,
            // Public paths still answer while the session store is down
            Err(e) if public => {
                warn!("Session lookup failed, continuing anonymously: {}", e);
                None
            }
            Err(e) => return Err(e),
        },
        None => None,
    };

    let authenticated = user.is_some();
    if let Some(user) = user {
        debug!("Authenticated user: {}", user.username);
        request.extensions_mut().insert(CurrentUser::from(user));
    }

    match security.rules.decide(request.uri().path(), authenticated) {
        Access::Permit => Ok(next.run(request).await),
        Access::RequireLogin => {
            debug!("Unauthenticated request to {}, redirecting to login", request.uri().path());
            Ok((StatusCode::FOUND, [(LOCATION, security.login_page.clone())]).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::user_details::{DatabaseUserDetailsService, UserDetailsService};
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, header::COOKIE},
        routing::get,
    };
    use tower::ServiceExt;
    use ums_db::{Database, NewUser};

    async fn whoami(user: CurrentUser) -> String {
        user.username
    }

    async fn setup() -> (Router, Arc<SessionManager>, UserDetails) {
        let (app, sessions, user, _) = setup_with_db().await;
        (app, sessions, user)
    }

    async fn setup_with_db() -> (Router, Arc<SessionManager>, UserDetails, Database) {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(NewUser {
            username: "kalyan".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            enabled: true,
        })
        .await
        .unwrap();
        let users = Arc::new(DatabaseUserDetailsService::new(db.clone()));
        let user = users.load_user_by_username("kalyan").await.unwrap().unwrap();
        let sessions = Arc::new(SessionManager::new(db.clone(), users, SessionConfig::default()));
        let security = Arc::new(WebSecurity::new(
            AccessRules::default(),
            sessions.clone(),
            "/login",
            "/logout",
        ));

        let app = Router::new()
            .route("/health", get(|| async { "UP" }))
            .route("/logout", get(|| async { "bye" }))
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn_with_state(security, security_filter));
        (app, sessions, user, db)
    }

    #[tokio::test]
    async fn test_public_path_passes_without_session() {
        let (app, _, _) = setup().await;
        let response = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_url_is_public() {
        let (app, _, _) = setup().await;
        let response = app
            .oneshot(HttpRequest::builder().uri("/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_path_redirects_to_login() {
        let (app, _, _) = setup().await;
        let response = app
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_session_cookie_grants_access() {
        let (app, sessions, user) = setup().await;
        let session = sessions.create(&user).await.unwrap();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(COOKIE, format!("UMS_SESSION={}", session.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session_cookie_redirects() {
        let (app, _, _) = setup().await;
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(COOKIE, "UMS_SESSION=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_public_path_survives_session_store_failure() {
        let (app, _, _, db) = setup_with_db().await;
        db.pool().close().await;

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .header(COOKIE, "UMS_SESSION=stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(COOKIE, "UMS_SESSION=stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_require_role() {
        let user = CurrentUser {
            id: 1,
            username: "kalyan".to_string(),
            roles: vec!["ADMIN".to_string()],
        };
        assert!(user.require_role("ROLE_ADMIN").is_ok());
        assert!(matches!(
            user.require_role("AUDITOR"),
            Err(AuthError::InsufficientPermissions)
        ));
    }
}
