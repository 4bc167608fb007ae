use std::{
    sync::Arc,
    time::{Duration, Instant},
};

#[cfg(test)]
use mockall::automock;
use reqwest::IntoUrl;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::error::AuthError;
use crate::jwk::jwk_set::JwkSet;

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait JwksDiscovery {
    async fn jwks(&self) -> Result<JwkSet, AuthError>;

    /// Fetches the key set again regardless of cache state, e.g. when a token names a `kid` that is not known yet.
    async fn refresh(&self) -> Result<JwkSet, AuthError> {
        self.jwks().await
    }
}

pub struct StaticJwksDiscovery {
    jwks: JwkSet,
}

impl StaticJwksDiscovery {
    pub fn new(jwks: JwkSet) -> Self {
        Self { jwks }
    }
}

#[async_trait::async_trait]
impl JwksDiscovery for StaticJwksDiscovery {
    async fn jwks(&self) -> Result<JwkSet, AuthError> {
        Ok(self.jwks.clone())
    }
}

struct CachedJwks {
    jwks: Option<JwkSet>,
    expiration: Instant,
}

/// Serves the JWKS of the identity provider from memory. The first call fetches inline; once the cache is older than
/// `refresh_interval` the stale set keeps being served while a single background task refreshes it.
pub struct CachedRemoteJwksDiscovery {
    client: reqwest::Client,
    jwks_url: url::Url,
    refresh_interval: Duration,
    cache: Arc<RwLock<CachedJwks>>,
    is_refreshing: Arc<Mutex<()>>,
}

impl CachedRemoteJwksDiscovery {
    pub fn new(jwks_url: url::Url, refresh_interval: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), jwks_url, refresh_interval)
    }

    pub fn with_client(client: reqwest::Client, jwks_url: url::Url, refresh_interval: Duration) -> Self {
        Self {
            client,
            jwks_url,
            refresh_interval,
            cache: Arc::new(RwLock::new(CachedJwks { jwks: None, expiration: Instant::now() })),
            is_refreshing: Arc::new(Mutex::new(())),
        }
    }

    fn spawn_background_refresh(&self) {
        let Ok(guard) = self.is_refreshing.clone().try_lock_owned() else {
            return;
        };
        let client = self.client.clone();
        let jwks_url = self.jwks_url.clone();
        let cache = self.cache.clone();
        let refresh_interval = self.refresh_interval;

        tokio::spawn(async move {
            let _guard = guard;
            match fetch_jwks(&client, jwks_url.clone()).await {
                Ok(jwks) => {
                    let mut cache = cache.write().await;
                    cache.jwks = Some(jwks);
                    cache.expiration = Instant::now() + refresh_interval;
                    debug!(%jwks_url, "jwks refreshed in background");
                }
                Err(err) => warn!(%jwks_url, error = %err, "failed to refresh jwks, keeping stale keys"),
            }
        });
    }
}

pub async fn fetch_jwks(client: &reqwest::Client, jwks_url: impl IntoUrl) -> Result<JwkSet, AuthError> {
    let response = client.get(jwks_url).send().await?.error_for_status()?;
    let jwks = response.json::<JwkSet>().await?;
    Ok(jwks)
}

#[async_trait::async_trait]
impl JwksDiscovery for CachedRemoteJwksDiscovery {
    async fn jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(jwks) = cache.jwks.as_ref() {
                if cache.expiration <= Instant::now() {
                    self.spawn_background_refresh();
                }
                return Ok(jwks.clone());
            }
        }

        self.refresh().await
    }

    async fn refresh(&self) -> Result<JwkSet, AuthError> {
        let _guard = self.is_refreshing.lock().await;
        let jwks = fetch_jwks(&self.client, self.jwks_url.clone()).await?;
        debug!(jwks_url = %self.jwks_url, keys = jwks.len(), "jwks fetched");

        let mut cache = self.cache.write().await;
        cache.jwks = Some(jwks.clone());
        cache.expiration = Instant::now() + self.refresh_interval;
        Ok(jwks)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{CachedRemoteJwksDiscovery, JwksDiscovery};
    use crate::auth::error::AuthError;

    fn jwks_document() -> serde_json::Value {
        json!({ "keys": [ { "kty": "RSA", "kid": "rsa1", "alg": "RS256", "n": "sXch", "e": "AQAB" } ] })
    }

    #[tokio::test]
    async fn when_cache_is_fresh_then_jwks_is_fetched_only_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/jwk", server.uri()).parse().expect("url should be valid");
        let discovery = CachedRemoteJwksDiscovery::new(url, Duration::from_secs(3600));

        let first = discovery.jwks().await.expect("first fetch should be successful");
        let second = discovery.jwks().await.expect("cached fetch should be successful");

        assert!(first.get("rsa1").is_some());
        assert!(second.get("rsa1").is_some());
    }

    #[tokio::test]
    async fn when_refresh_is_forced_then_jwks_is_fetched_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/jwk", server.uri()).parse().expect("url should be valid");
        let discovery = CachedRemoteJwksDiscovery::new(url, Duration::from_secs(3600));

        discovery.jwks().await.expect("first fetch should be successful");
        discovery.refresh().await.expect("forced refresh should be successful");
    }

    #[tokio::test]
    async fn when_jwks_endpoint_fails_then_fetch_error_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/jwk")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let url = format!("{}/jwk", server.uri()).parse().expect("url should be valid");
        let discovery = CachedRemoteJwksDiscovery::new(url, Duration::from_secs(3600));

        assert!(matches!(discovery.jwks().await, Err(AuthError::JwkSetFetchError(_))));
    }
}
