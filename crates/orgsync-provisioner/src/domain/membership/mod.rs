use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use orgsync_token::claim::Role;
use serde::{Deserialize, Serialize};

mod grafana;

pub(crate) use grafana::{GrafanaCredentials, GrafanaMembershipClient};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub(crate) struct OrganizationId(pub i64);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub(crate) struct UserId(pub i64);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user's binding to one organization as reported by the downstream application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Membership {
    pub organization_id: OrganizationId,
    pub organization_name: String,
    /// `None` when the downstream role is not one of ours (e.g. Grafana's `None` basic role).
    pub role: Option<Role>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AddMembershipOutcome {
    Added,
    AlreadyMember,
}

/// Account to create for an identity that the downstream application does not know yet.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser").field("name", &self.name).field("email", &self.email).finish_non_exhaustive()
    }
}

/// Admin API of the downstream application. Every method is exactly one remote call, nothing is retried.
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait MembershipClient {
    async fn find_organization(&self, name: &str) -> Result<Option<OrganizationId>>;
    async fn create_organization(&self, name: &str) -> Result<OrganizationId>;
    async fn find_user(&self, login_or_email: &str) -> Result<Option<UserId>>;
    async fn create_user(&self, user: &NewUser) -> Result<UserId>;
    async fn list_memberships(&self, user_id: UserId) -> Result<Vec<Membership>>;
    async fn add_membership(
        &self,
        organization_id: OrganizationId,
        login_or_email: &str,
        role: Role,
    ) -> Result<AddMembershipOutcome>;
    async fn patch_role(&self, organization_id: OrganizationId, user_id: UserId, role: Role) -> Result<()>;
    async fn remove_membership(&self, organization_id: OrganizationId, user_id: UserId) -> Result<()>;
    async fn set_default_organization(&self, user_id: UserId, organization_id: OrganizationId) -> Result<()>;
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },
    #[error("{operation} failed with status {status}: {message}")]
    UnexpectedStatus { operation: &'static str, status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
