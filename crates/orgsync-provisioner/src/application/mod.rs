use std::{sync::Arc, time::Duration};

use orgsync_token::{
    auth::{
        extractor::{AuthHeaderTokenExtractor, BasicBodyTokenExtractor, TokenExtractor},
        jwks_discovery::CachedRemoteJwksDiscovery,
        validator::TokenValidator,
    },
    claim::ClaimMapping,
};

use crate::{
    config::{ApplicationConfig, GrafanaAuthConfig, InboundConfig},
    domain::{
        membership::{GrafanaCredentials, GrafanaMembershipClient},
        reconciliation::{ReconciliationOptions, Reconciler},
    },
};

use self::provisioning::{ProvisioningUseCase, ProvisioningUseCaseImpl};

pub(crate) mod provisioning;

pub(crate) struct Application {
    token_extractor: Arc<dyn TokenExtractor>,
    token_validator: Arc<TokenValidator>,
    reconciler: Arc<Reconciler>,
}

impl Application {
    pub fn new(
        token_extractor: Arc<dyn TokenExtractor>,
        token_validator: Arc<TokenValidator>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self { token_extractor, token_validator, reconciler }
    }

    pub fn provisioning(&self) -> impl ProvisioningUseCase {
        ProvisioningUseCaseImpl::new(
            self.token_extractor.clone(),
            self.token_validator.clone(),
            self.reconciler.clone(),
        )
    }
}

pub(super) fn init(config: &ApplicationConfig) -> anyhow::Result<Application> {
    let http_client = reqwest::Client::builder().timeout(Duration::from_secs(config.grafana.timeout)).build()?;

    let jwks_discovery = CachedRemoteJwksDiscovery::with_client(
        http_client.clone(),
        config.token.jwks_url.clone(),
        Duration::from_secs(config.token.jwks_refresh_interval),
    );
    let token_validator = TokenValidator::builder()
        .jwks_discovery(Arc::new(jwks_discovery))
        .audience(config.token.audience.clone())
        .maybe_issuer(config.token.issuer.clone())
        .claim_mapping(ClaimMapping {
            role_claim: config.token.role_claim.clone(),
            derive_roles_from_raw: config.token.derive_roles_from_raw,
        })
        .leeway(Duration::from_secs(config.token.leeway))
        .build();

    let membership_client = GrafanaMembershipClient::new(
        http_client,
        config.grafana.endpoint.clone(),
        create_grafana_credentials(&config.grafana.auth),
    );
    let reconciler = Reconciler::new(
        Arc::new(membership_client),
        ReconciliationOptions {
            remove_stale_memberships: config.reconciliation.remove_stale_memberships,
            set_default_organization: config.reconciliation.set_default_organization,
        },
    );

    Ok(Application::new(create_token_extractor(&config.inbound), Arc::new(token_validator), Arc::new(reconciler)))
}

fn create_grafana_credentials(config: &GrafanaAuthConfig) -> GrafanaCredentials {
    match config {
        GrafanaAuthConfig::Basic { username, password } => {
            GrafanaCredentials::Basic { username: username.clone(), password: password.clone() }
        }
        GrafanaAuthConfig::Bearer { token } => GrafanaCredentials::Bearer { token: token.clone() },
    }
}

fn create_token_extractor(config: &InboundConfig) -> Arc<dyn TokenExtractor> {
    match config {
        InboundConfig::Bearer => Arc::new(AuthHeaderTokenExtractor),
        InboundConfig::BasicBody { username, password } => {
            Arc::new(BasicBodyTokenExtractor::new(username.clone(), password.clone()))
        }
    }
}
