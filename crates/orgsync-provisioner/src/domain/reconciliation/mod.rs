use std::{fmt, sync::Arc};

use futures_util::future::join_all;
use orgsync_token::claim::{Role, RoleClaim};
use tracing::{debug, info, warn};

use super::{
    membership::{self, AddMembershipOutcome, Membership, MembershipClient, NewUser, OrganizationId, UserId},
    random::random_password,
};

/// Who is being provisioned. The email is the login at the downstream application.
#[derive(Clone, Debug)]
pub(crate) struct Identity {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ReconciliationOptions {
    /// Drop memberships of organizations that are not part of the desired state.
    pub remove_stale_memberships: bool,
    /// Switch the user to the last organization of the desired state.
    pub set_default_organization: bool,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self { remove_stale_memberships: true, set_default_organization: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoleAction {
    Added,
    Patched,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AppliedRole {
    pub organization: String,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub action: RoleAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailureStage {
    ResolveOrganization,
    AssignRole,
    SetDefaultOrganization,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::ResolveOrganization => "resolve_organization",
            FailureStage::AssignRole => "assign_role",
            FailureStage::SetDefaultOrganization => "set_default_organization",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OrganizationFailure {
    pub organization: String,
    pub stage: FailureStage,
    pub message: String,
}

/// `organization` is `None` when the membership listing itself failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RemovalFailure {
    pub organization: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug)]
pub(crate) struct ReconcileOutcome {
    pub user_id: UserId,
    /// Roles that were applied, in desired-state order.
    pub applied: Vec<AppliedRole>,
    pub removed: Vec<String>,
    pub removal_failures: Vec<RemovalFailure>,
    pub failures: Vec<OrganizationFailure>,
    pub default_organization: Option<String>,
}

impl ReconcileOutcome {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            applied: Vec::new(),
            removed: Vec::new(),
            removal_failures: Vec::new(),
            failures: Vec::new(),
            default_organization: None,
        }
    }

    fn fail(&mut self, organization: &str, stage: FailureStage, error: &membership::Error) {
        warn!(organization, %stage, error = %error, "organization could not be converged");
        self.failures.push(OrganizationFailure {
            organization: organization.to_owned(),
            stage,
            message: error.to_string(),
        });
    }
}

/// Drives the memberships of one user at the downstream application towards the organization → role mapping
/// asserted by the identity provider.
///
/// Organizations are processed one after another in the order of the mapping so that the last one reliably becomes
/// the default organization. Only a user that can neither be found nor created aborts the run; everything scoped to a
/// single organization is recorded in the [`ReconcileOutcome`] and the run carries on.
pub(crate) struct Reconciler {
    membership_client: Arc<dyn MembershipClient + Send + Sync>,
    options: ReconciliationOptions,
}

impl Reconciler {
    pub fn new(membership_client: Arc<dyn MembershipClient + Send + Sync>, options: ReconciliationOptions) -> Self {
        Self { membership_client, options }
    }

    pub async fn reconcile(&self, identity: &Identity, desired_roles: &RoleClaim) -> Result<ReconcileOutcome> {
        let desired_roles = parse_roles(desired_roles)?;

        let user_id = self.resolve_user(identity).await?;
        let mut outcome = ReconcileOutcome::new(user_id);

        if self.options.remove_stale_memberships {
            self.remove_stale_memberships(user_id, &desired_roles, &mut outcome).await;
        }

        let last = desired_roles.len().checked_sub(1);
        for (index, (organization, role)) in desired_roles.iter().enumerate() {
            let is_default = self.options.set_default_organization && Some(index) == last;
            self.converge_organization(identity, user_id, organization, *role, is_default, &mut outcome).await;
        }

        info!(
            email = %identity.email,
            user_id = %user_id,
            applied = outcome.applied.len(),
            removed = outcome.removed.len(),
            failures = outcome.failures.len() + outcome.removal_failures.len(),
            "reconciliation finished"
        );
        Ok(outcome)
    }

    async fn resolve_user(&self, identity: &Identity) -> Result<UserId> {
        match self.membership_client.find_user(&identity.email).await {
            Ok(Some(user_id)) => return Ok(user_id),
            Ok(None) => debug!(email = %identity.email, "user not found, creating"),
            Err(err) => warn!(email = %identity.email, error = %err, "user lookup failed, trying to create"),
        }

        let new_user =
            NewUser { name: identity.name.clone(), email: identity.email.clone(), password: random_password() };
        let provisioning_failed = |source| Error::UserProvisioningFailed { email: identity.email.clone(), source };

        match self.membership_client.create_user(&new_user).await {
            Ok(user_id) => {
                info!(email = %identity.email, user_id = %user_id, "user created");
                Ok(user_id)
            }
            // Someone else created the user between our lookup and create.
            Err(conflict @ membership::Error::Conflict { .. }) => {
                match self.membership_client.find_user(&identity.email).await {
                    Ok(Some(user_id)) => Ok(user_id),
                    Ok(None) => Err(provisioning_failed(conflict)),
                    Err(err) => Err(provisioning_failed(err)),
                }
            }
            Err(err) => Err(provisioning_failed(err)),
        }
    }

    async fn remove_stale_memberships(
        &self,
        user_id: UserId,
        desired_roles: &[(String, Role)],
        outcome: &mut ReconcileOutcome,
    ) {
        let memberships = match self.membership_client.list_memberships(user_id).await {
            Ok(memberships) => memberships,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "listing memberships failed, skipping removals");
                outcome.removal_failures.push(RemovalFailure { organization: None, message: err.to_string() });
                return;
            }
        };

        let stale: Vec<Membership> = memberships
            .into_iter()
            .filter(|membership| !desired_roles.iter().any(|(org, _)| *org == membership.organization_name))
            .collect();

        let results = join_all(stale.iter().map(|membership| async move {
            (membership, self.membership_client.remove_membership(membership.organization_id, user_id).await)
        }))
        .await;

        for (membership, result) in results {
            match result {
                Ok(()) => {
                    info!(
                        organization = %membership.organization_name,
                        role = ?membership.role,
                        user_id = %user_id,
                        "membership removed"
                    );
                    outcome.removed.push(membership.organization_name.clone());
                }
                Err(err) => {
                    warn!(organization = %membership.organization_name, error = %err, "membership removal failed");
                    outcome.removal_failures.push(RemovalFailure {
                        organization: Some(membership.organization_name.clone()),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    async fn converge_organization(
        &self,
        identity: &Identity,
        user_id: UserId,
        organization: &str,
        role: Role,
        is_default: bool,
        outcome: &mut ReconcileOutcome,
    ) {
        let organization_id = match self.resolve_organization(organization).await {
            Ok(organization_id) => organization_id,
            Err(err) => return outcome.fail(organization, FailureStage::ResolveOrganization, &err),
        };

        let action = match self.assign_role(organization_id, identity, user_id, role).await {
            Ok(action) => action,
            Err(err) => return outcome.fail(organization, FailureStage::AssignRole, &err),
        };
        let applied = AppliedRole { organization: organization.to_owned(), organization_id, role, action };
        debug!(
            organization,
            organization_id = %applied.organization_id,
            role = %applied.role,
            action = ?applied.action,
            "role applied"
        );
        outcome.applied.push(applied);

        if is_default {
            match self.membership_client.set_default_organization(user_id, organization_id).await {
                Ok(()) => outcome.default_organization = Some(organization.to_owned()),
                Err(err) => outcome.fail(organization, FailureStage::SetDefaultOrganization, &err),
            }
        }
    }

    async fn resolve_organization(&self, organization: &str) -> membership::Result<OrganizationId> {
        if let Some(organization_id) = self.membership_client.find_organization(organization).await? {
            return Ok(organization_id);
        }

        match self.membership_client.create_organization(organization).await {
            Ok(organization_id) => {
                info!(organization, organization_id = %organization_id, "organization created");
                Ok(organization_id)
            }
            Err(conflict @ membership::Error::Conflict { .. }) => {
                self.membership_client.find_organization(organization).await?.ok_or(conflict)
            }
            Err(err) => Err(err),
        }
    }

    async fn assign_role(
        &self,
        organization_id: OrganizationId,
        identity: &Identity,
        user_id: UserId,
        role: Role,
    ) -> membership::Result<RoleAction> {
        match self.membership_client.add_membership(organization_id, &identity.email, role).await? {
            AddMembershipOutcome::Added => Ok(RoleAction::Added),
            AddMembershipOutcome::AlreadyMember => {
                self.membership_client.patch_role(organization_id, user_id, role).await?;
                Ok(RoleAction::Patched)
            }
        }
    }
}

fn parse_roles(desired_roles: &RoleClaim) -> Result<Vec<(String, Role)>> {
    desired_roles
        .iter()
        .map(|(organization, role)| {
            role.parse::<Role>()
                .map(|role| (organization.to_owned(), role))
                .map_err(|_| Error::InvalidRole { organization: organization.to_owned(), role: role.to_owned() })
        })
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("role '{role}' of organization '{organization}' is not one of Admin, Editor or Viewer")]
    InvalidRole { organization: String, role: String },
    #[error("user '{email}' could not be found or created: {source}")]
    UserProvisioningFailed {
        email: String,
        #[source]
        source: membership::Error,
    },
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
