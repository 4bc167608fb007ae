use std::sync::Arc;

use axum::{
    body::Bytes,
    debug_handler,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{error, info, warn};

use crate::{
    application::{
        provisioning::{self, ProvisioningData, ProvisioningUseCase},
        Application,
    },
    domain::reconciliation::{OrganizationFailure, RemovalFailure},
    server::response::{message_payload, message_payload_with_error},
};

use self::response::{FailureResponse, ProvisionResponse};

mod response;

const SUCCESS_MESSAGE: &str = "Provisioning completed";
const MISSING_TOKEN_MESSAGE: &str = "Missing token";
const INCORRECT_SIGNATURE_MESSAGE: &str = "Incorrect signature";
const MISSING_ROLES_MESSAGE: &str = "Missing roles from the identity provider. Check the claim mapping";
const DOWNSTREAM_FAILURE_MESSAGE: &str = "Downstream call failure";

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    Router::new().route("/", post(handle_provision)).with_state(application)
}

#[debug_handler]
async fn handle_provision(
    State(application): State<Arc<Application>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, provisioning::Error> {
    let data = application.provisioning().provision(&headers, &body).await?;
    info!(
        email = %data.identity.email,
        name = %data.identity.name,
        user_id = %data.outcome.user_id,
        "provisioning completed"
    );

    Ok((StatusCode::OK, Json(ProvisionResponse::from(data))))
}

impl From<ProvisioningData> for ProvisionResponse {
    fn from(value: ProvisioningData) -> Self {
        let outcome = value.outcome;
        let failures = outcome
            .removal_failures
            .into_iter()
            .map(FailureResponse::from)
            .chain(outcome.failures.into_iter().map(FailureResponse::from))
            .collect();
        let roles =
            outcome.applied.iter().map(|applied| (applied.organization.as_str(), applied.role.as_str())).collect();

        Self {
            message: SUCCESS_MESSAGE,
            roles,
            removed: outcome.removed,
            failures,
            default_organization: outcome.default_organization,
        }
    }
}

impl From<OrganizationFailure> for FailureResponse {
    fn from(value: OrganizationFailure) -> Self {
        Self { organization: Some(value.organization), stage: value.stage.as_str(), message: value.message }
    }
}

impl From<RemovalFailure> for FailureResponse {
    fn from(value: RemovalFailure) -> Self {
        let stage = if value.organization.is_some() { "remove_membership" } else { "list_memberships" };
        Self { organization: value.organization, stage, message: value.message }
    }
}

impl IntoResponse for provisioning::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            provisioning::Error::MissingCredential(e) => {
                warn!(error = %e, "request without credential");
                (StatusCode::BAD_REQUEST, message_payload(MISSING_TOKEN_MESSAGE)).into_response()
            }
            provisioning::Error::Unauthorized(e) => {
                warn!(error = %e, "request with invalid credential");
                (StatusCode::UNAUTHORIZED, message_payload_with_error(INCORRECT_SIGNATURE_MESSAGE, e)).into_response()
            }
            provisioning::Error::MissingRoleClaim => {
                (StatusCode::INTERNAL_SERVER_ERROR, message_payload(MISSING_ROLES_MESSAGE)).into_response()
            }
            provisioning::Error::Reconciliation(e) => {
                error!(error = %e, "reconciliation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message_payload_with_error(DOWNSTREAM_FAILURE_MESSAGE, e))
                    .into_response()
            }
        }
    }
}
