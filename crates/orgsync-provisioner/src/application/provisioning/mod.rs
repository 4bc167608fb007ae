use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use orgsync_token::auth::{error::AuthError, extractor::TokenExtractor, validator::TokenValidator};
use tracing::{error, info};

use crate::domain::reconciliation::{Error as ReconciliationError, Identity, ReconcileOutcome, Reconciler};

#[cfg(test)]
pub(crate) mod fixture;

pub(crate) struct ProvisioningData {
    pub identity: Identity,
    pub outcome: ReconcileOutcome,
}

#[async_trait]
pub(crate) trait ProvisioningUseCase {
    /// Authenticates the request and converges the caller's memberships to the roles in its token.
    async fn provision(&self, headers: &HeaderMap, body: &[u8]) -> Result<ProvisioningData>;
}

pub(crate) struct ProvisioningUseCaseImpl {
    token_extractor: Arc<dyn TokenExtractor>,
    token_validator: Arc<TokenValidator>,
    reconciler: Arc<Reconciler>,
}

impl ProvisioningUseCaseImpl {
    pub fn new(
        token_extractor: Arc<dyn TokenExtractor>,
        token_validator: Arc<TokenValidator>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self { token_extractor, token_validator, reconciler }
    }
}

#[async_trait]
impl ProvisioningUseCase for ProvisioningUseCaseImpl {
    async fn provision(&self, headers: &HeaderMap, body: &[u8]) -> Result<ProvisioningData> {
        let token = self.token_extractor.extract(headers, body)?;
        let claim = self.token_validator.verify(&token).await?;

        let Some(roles) = claim.roles else {
            error!(email = %claim.email, "verified token carries no role mapping");
            return Err(Error::MissingRoleClaim);
        };
        info!(email = %claim.email, roles = ?roles, "roles asserted by identity provider");

        let identity = Identity { name: claim.username, email: claim.email };
        let outcome = self.reconciler.reconcile(&identity, &roles).await?;

        Ok(ProvisioningData { identity, outcome })
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("{0}")]
    MissingCredential(#[source] AuthError),
    #[error("{0}")]
    Unauthorized(#[source] AuthError),
    #[error("verified token carries no role mapping")]
    MissingRoleClaim,
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        if value.is_missing_credential() {
            Self::MissingCredential(value)
        } else {
            Self::Unauthorized(value)
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
