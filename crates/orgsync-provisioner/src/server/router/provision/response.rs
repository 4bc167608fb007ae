use orgsync_token::claim::RoleClaim;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub(super) struct ProvisionResponse {
    pub message: &'static str,
    /// Applied organization → role mapping, in claim order.
    pub roles: RoleClaim,
    pub removed: Vec<String>,
    pub failures: Vec<FailureResponse>,
    pub default_organization: Option<String>,
}

#[derive(Serialize, Debug)]
pub(super) struct FailureResponse {
    pub organization: Option<String>,
    pub stage: &'static str,
    pub message: String,
}
