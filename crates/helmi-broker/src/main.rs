use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use helmi_broker::{http, AppState, Config};
use helmi_catalog::Catalog;
use helmi_helm::HelmClient;
use helmi_kube::ClusterClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env()?);
    if !config.auth_enabled() {
        tracing::warn!("username and/or password not specified, authentication is disabled");
    }

    let helm = HelmClient::new();
    for (name, url) in &config.repository_urls {
        helm.repo_add(name, url).await?;
        tracing::info!(repository = name.as_str(), "chart repository registered");
    }
    if !config.repository_urls.is_empty() {
        helm.repo_update().await?;
    }

    let cluster = ClusterClient::connect().await?;
    let catalog = Arc::new(Catalog::load(config.catalog_url.clone()).await?);
    tracing::info!(
        source = config.catalog_url.as_str(),
        services = catalog.services().len(),
        "catalog loaded"
    );

    spawn_catalog_refresh(catalog.clone(), helm.clone(), config.catalog_update_interval);

    let state = AppState::new(config.clone(), catalog, helm, cluster);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "helmi is ready");

    axum::serve(listener, http::router(state)).await?;
    Ok(())
}

/// Periodic catalog refresh for the process lifetime
///
/// Failures keep the previous snapshot; both steps log and continue.
fn spawn_catalog_refresh(catalog: Arc<Catalog>, helm: HelmClient, interval: std::time::Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            if let Err(err) = helm.repo_update().await {
                tracing::warn!(error = %err, "chart repository update failed");
            }

            match catalog.reload().await {
                Ok(count) => tracing::debug!(services = count, "catalog refreshed"),
                Err(err) => tracing::warn!(error = %err, "catalog refresh failed, keeping previous snapshot"),
            }
        }
    });
}
