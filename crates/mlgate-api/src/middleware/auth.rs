use axum::{extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use subtle::ConstantTimeEq;

use crate::{AppState, error::ApiError};

/// Path that stays reachable without credentials (liveness checks)
pub const UNAUTHENTICATED_PATH: &str = "/health";

/// Username/password pair required on every protected request
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Constant-time check of a presented username/password pair
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let password_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        (username_ok & password_ok).into()
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Authentication middleware
///
/// Open access when no credentials are configured.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(credentials) = state.credentials() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == UNAUTHENTICATED_PATH {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .typed_get::<Authorization<Basic>>()
        .is_some_and(|auth| credentials.verify(auth.username(), auth.password()));

    if !authorized {
        tracing::debug!(path = %request.uri().path(), "Rejected request without valid credentials");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_exact_match() {
        let credentials = BasicCredentials::new("admin", "s3cret");
        assert!(credentials.verify("admin", "s3cret"));
    }

    #[test]
    fn test_verify_rejects_single_character_difference() {
        let credentials = BasicCredentials::new("admin", "s3cret");
        assert!(!credentials.verify("admin", "s3creT"));
        assert!(!credentials.verify("admiN", "s3cret"));
        assert!(!credentials.verify("admin", "s3cre"));
        assert!(!credentials.verify("", ""));
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", BasicCredentials::new("admin", "s3cret"));
        assert!(!rendered.contains("s3cret"));
    }
}
