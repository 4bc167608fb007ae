use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use crate::{application::Application, config::ApplicationConfig};

mod response;
mod router;

pub(super) struct ServerConfig {
    pub port: u16,
    pub path_prefix: Option<String>,
}

impl From<&ApplicationConfig> for ServerConfig {
    fn from(value: &ApplicationConfig) -> Self {
        Self { port: value.port, path_prefix: value.path_prefix.clone() }
    }
}

pub(super) async fn run(application: Application, config: ServerConfig) -> anyhow::Result<()> {
    let app = app(Arc::new(application), config.path_prefix.as_deref());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("starting provisioner server on {}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn app(application: Arc<Application>, path_prefix: Option<&str>) -> Router {
    let provision_router = router::provision::router(application);

    let app = match normalize_path_prefix(path_prefix) {
        Some(path_prefix) => Router::new().nest(&path_prefix, provision_router),
        None => Router::new().merge(provision_router),
    };
    app.route("/health", get(|| async { "" }))
}

/// `None` when the handler is mounted at the root.
fn normalize_path_prefix(path_prefix: Option<&str>) -> Option<String> {
    let trimmed = path_prefix?.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[cfg(test)]
mod test {
    use super::normalize_path_prefix;

    #[test]
    fn path_prefix_is_normalized() {
        assert_eq!(normalize_path_prefix(None), None);
        assert_eq!(normalize_path_prefix(Some("/")), None);
        assert_eq!(normalize_path_prefix(Some("provision/")), Some("/provision".to_owned()));
        assert_eq!(normalize_path_prefix(Some("/hooks/grafana")), Some("/hooks/grafana".to_owned()));
    }
}
