//! Active health probes
//!
//! Service authors declare probe URIs in their credentials template; the
//! URI scheme selects the protocol. Every probe gets ten seconds. A probe
//! failure is not an error to the client, it just keeps the release
//! not-ready until the timeout converts it into a failure.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid health check url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("health check returned http status {0}")]
    HttpStatus(u16),

    #[error("http health check failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("health check timed out")]
    Timeout,

    #[error("tls handshake failed: {0}")]
    Tls(String),
}

/// Run one probe against a declared endpoint
pub async fn check_health(endpoint: &str) -> Result<(), ProbeError> {
    let url = Url::parse(endpoint).map_err(|err| ProbeError::InvalidUrl {
        url: endpoint.to_string(),
        message: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => check_http(&url).await,
        "tcp" => check_tcp(&url).await,
        "tls" => check_tls(&url).await,
        scheme => Err(ProbeError::UnsupportedScheme(scheme.to_string())),
    }
}

/// GET the endpoint; anything below 400 passes. URI userinfo becomes
/// basic auth.
async fn check_http(url: &Url) -> Result<(), ProbeError> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    let username = url.username().to_string();
    let password = url.password().map(str::to_string);

    let mut target = url.clone();
    let _ = target.set_username("");
    let _ = target.set_password(None);

    let mut request = client.get(target);
    if !username.is_empty() {
        request = request.basic_auth(username, password);
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    if status >= 400 {
        return Err(ProbeError::HttpStatus(status));
    }

    Ok(())
}

async fn check_tcp(url: &Url) -> Result<(), ProbeError> {
    let address = host_port(url)?;
    tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&address))
        .await
        .map_err(|_| ProbeError::Timeout)??;
    Ok(())
}

/// Dial and complete a TLS handshake against the host CA pool, verifying
/// hostname, chain and expiry
async fn check_tls(url: &Url) -> Result<(), ProbeError> {
    let address = host_port(url)?;
    let host = url
        .host_str()
        .ok_or_else(|| ProbeError::InvalidUrl {
            url: url.to_string(),
            message: "missing host".to_string(),
        })?
        .to_string();

    // pin a crypto provider before the first builder call
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();

    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let server_name = ServerName::try_from(host).map_err(|err| ProbeError::InvalidUrl {
        url: url.to_string(),
        message: err.to_string(),
    })?;

    let stream = tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&address))
        .await
        .map_err(|_| ProbeError::Timeout)??;

    tokio::time::timeout(PROBE_TIMEOUT, connector.connect(server_name, stream))
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(|err| ProbeError::Tls(err.to_string()))?;

    Ok(())
}

fn host_port(url: &Url) -> Result<String, ProbeError> {
    let host = url.host_str().ok_or_else(|| ProbeError::InvalidUrl {
        url: url.to_string(),
        message: "missing host".to_string(),
    })?;
    let port = url.port().ok_or_else(|| ProbeError::InvalidUrl {
        url: url.to_string(),
        message: "missing port".to_string(),
    })?;

    Ok(format!("{}:{}", host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("127.0.0.1:{}", address.port())
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let err = check_health("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedScheme(scheme) if scheme == "ftp"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        assert!(matches!(
            check_health("not a url").await,
            Err(ProbeError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_missing_port() {
        assert!(matches!(
            check_health("tcp://127.0.0.1").await,
            Err(ProbeError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_tcp_probe_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        check_health(&format!("tcp://127.0.0.1:{}", port))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_tcp_probe_refused() {
        // a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(check_health(&format!("tcp://127.0.0.1:{}", port))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_http_probe_status_matrix() {
        let router = Router::new()
            .route("/status/200", get(|| async { StatusCode::OK }))
            .route("/status/404", get(|| async { StatusCode::NOT_FOUND }))
            .route("/status/500", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let address = serve(router).await;

        check_health(&format!("http://{}/status/200", address))
            .await
            .unwrap();

        assert!(matches!(
            check_health(&format!("http://{}/status/404", address)).await,
            Err(ProbeError::HttpStatus(404))
        ));
        assert!(matches!(
            check_health(&format!("http://{}/status/500", address)).await,
            Err(ProbeError::HttpStatus(500))
        ));
    }

    #[tokio::test]
    async fn test_http_probe_sends_userinfo_as_basic_auth() {
        use axum::http::header::AUTHORIZATION;
        use axum::http::HeaderMap;

        let router = Router::new().route(
            "/guarded",
            get(|headers: HeaderMap| async move {
                let expected = "Basic dXNlcjpwYXNz"; // user:pass
                match headers.get(AUTHORIZATION) {
                    Some(value) if value == expected => StatusCode::OK,
                    _ => StatusCode::UNAUTHORIZED,
                }
            }),
        );
        let address = serve(router).await;

        check_health(&format!("http://user:pass@{}/guarded", address))
            .await
            .unwrap();

        assert!(matches!(
            check_health(&format!("http://{}/guarded", address)).await,
            Err(ProbeError::HttpStatus(401))
        ));
    }

    #[tokio::test]
    async fn test_tls_probe_against_plaintext_listener_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                // accept and immediately drop, never speaking TLS
                let _ = listener.accept().await;
            }
        });

        assert!(check_health(&format!("tls://127.0.0.1:{}", port))
            .await
            .is_err());
    }
}
