//! HTTP basic authentication middleware
//!
//! Liveness and readiness stay open so the orchestrator can probe the
//! broker; everything else requires the configured credentials. With no
//! credentials configured, authentication is disabled entirely.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;

use super::AppState;

const PUBLIC_PATHS: [&str; 2] = ["/liveness", "/readiness"];

pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.auth_enabled() || PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| credentials_match(value, &state.config.username, &state.config.password))
        .unwrap_or(false);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"helmi\"")],
            "Unauthorized.",
        )
            .into_response();
    }

    next.run(request).await
}

fn credentials_match(header_value: &str, username: &str, password: &str) -> bool {
    let Some(encoded) = header_value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((given_user, given_password)) = decoded.split_once(':') else {
        return false;
    };

    given_user == username && given_password == password
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, password: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password))
        )
    }

    #[test]
    fn test_credentials_match() {
        assert!(credentials_match(&basic("admin", "secret"), "admin", "secret"));
        assert!(!credentials_match(&basic("admin", "wrong"), "admin", "secret"));
        assert!(!credentials_match(&basic("other", "secret"), "admin", "secret"));
    }

    #[test]
    fn test_malformed_headers_rejected() {
        assert!(!credentials_match("Bearer token", "admin", "secret"));
        assert!(!credentials_match("Basic !!!", "admin", "secret"));
        assert!(!credentials_match("Basic ", "admin", "secret"));
        assert!(!credentials_match(
            &format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode("no-separator")
            ),
            "admin",
            "secret"
        ));
    }
}
