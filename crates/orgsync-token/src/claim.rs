use std::{fmt, str::FromStr};

use josekit::{jwt::JwtPayload, Map, Value};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::error::JWTError;

pub const USERNAME_CLAIM: &str = "username";
pub const EMAIL_CLAIM: &str = "email";
pub const RAW_ROLES_CLAIM: &str = "roles";
pub const DEFAULT_ROLE_CLAIM: &str = "grafana/roles";

const COMPONENTS_PREFIX: &str = "components/";
const PROVIDER_ROLE_TOKEN: &str = "ROLE_PROVIDER";
const EDITOR_ROLE_TOKEN: &str = "Editor";

/// Claims of a verified token that drive provisioning.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    pub subject: Option<String>,
    pub username: String,
    pub email: String,
    /// `None` when the token carries no role mapping at all.
    pub roles: Option<RoleClaim>,
}

/// Where the organization/role mapping is read from in the token payload.
#[derive(Debug, Clone)]
pub struct ClaimMapping {
    pub role_claim: String,
    /// Derive the mapping from the raw `roles` claim when `role_claim` is absent.
    pub derive_roles_from_raw: bool,
}

impl Default for ClaimMapping {
    fn default() -> Self {
        Self { role_claim: DEFAULT_ROLE_CLAIM.to_owned(), derive_roles_from_raw: false }
    }
}

impl IdentityClaim {
    pub fn from_payload(payload: &JwtPayload, mapping: &ClaimMapping) -> Result<Self, JWTError> {
        let email = string_claim(payload, EMAIL_CLAIM)?.ok_or(JWTError::MissingClaim(EMAIL_CLAIM))?;
        let username = string_claim(payload, USERNAME_CLAIM)?.unwrap_or_else(|| email.clone());

        let roles = match payload.claim(&mapping.role_claim) {
            Some(Value::Object(ref map)) => Some(RoleClaim::from_claim(&mapping.role_claim, map)?),
            Some(Value::Null) | None if mapping.derive_roles_from_raw => raw_roles(payload)?.map(map_raw_roles),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(JWTError::InvalidClaim { claim: mapping.role_claim.clone(), reason: "expected an object" })
            }
        };

        Ok(IdentityClaim { subject: payload.subject().map(str::to_owned), username, email, roles })
    }
}

fn string_claim(payload: &JwtPayload, claim: &'static str) -> Result<Option<String>, JWTError> {
    match payload.claim(claim) {
        Some(Value::String(ref s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(Value::String(_)) | Some(Value::Null) | None => Ok(None),
        Some(_) => Err(JWTError::InvalidClaim { claim: claim.to_owned(), reason: "expected a string" }),
    }
}

fn raw_roles(payload: &JwtPayload) -> Result<Option<Vec<String>>, JWTError> {
    match payload.claim(RAW_ROLES_CLAIM) {
        Some(Value::Array(ref values)) => values
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or(JWTError::InvalidClaim { claim: RAW_ROLES_CLAIM.to_owned(), reason: "expected strings" }),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(JWTError::InvalidClaim { claim: RAW_ROLES_CLAIM.to_owned(), reason: "expected an array" }),
    }
}

/// Ordered organization → role token mapping. Keys are unique and keep the order they had in the token.
///
/// Role tokens are kept as strings here; turning them into a [`Role`] is left to the consumer so that an unknown
/// token can be reported against the organization it was found on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleClaim(Vec<(String, String)>);

impl RoleClaim {
    fn from_claim(claim: &str, map: &Map<String, Value>) -> Result<Self, JWTError> {
        map.iter()
            .map(|(org, role)| match role {
                Value::String(role) => Ok((org.clone(), role.clone())),
                _ => Err(JWTError::InvalidClaim { claim: claim.to_owned(), reason: "role values must be strings" }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RoleClaim)
    }

    pub fn get(&self, organization: &str) -> Option<&str> {
        self.0.iter().find(|(org, _)| org == organization).map(|(_, role)| role.as_str())
    }

    /// Replaces the role of an existing organization in place, otherwise appends.
    pub fn insert(&mut self, organization: impl Into<String>, role: impl Into<String>) {
        let organization = organization.into();
        let role = role.into();
        match self.0.iter_mut().find(|(org, _)| *org == organization) {
            Some(entry) => entry.1 = role,
            None => self.0.push((organization, role)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(org, role)| (org.as_str(), role.as_str()))
    }

    pub fn contains(&self, organization: &str) -> bool {
        self.get(organization).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<O: Into<String>, R: Into<String>> FromIterator<(O, R)> for RoleClaim {
    fn from_iter<T: IntoIterator<Item = (O, R)>>(iter: T) -> Self {
        let mut claim = RoleClaim::default();
        for (org, role) in iter {
            claim.insert(org, role);
        }
        claim
    }
}

impl Serialize for RoleClaim {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (org, role) in &self.0 {
            map.serialize_entry(org, role)?;
        }
        map.end()
    }
}

/// Turns raw identity provider roles of the shape `components/<org-path>:<ROLE_TOKEN>` into an organization → role
/// mapping.
///
/// Org paths are flattened by replacing every `/` and the first `.` with `_`. For the same organization
/// `ROLE_PROVIDER` always yields Admin, `Editor` upgrades anything but Admin, and any other token only assigns
/// Viewer when the organization has no role yet.
pub fn map_raw_roles<I, S>(raw_roles: I) -> RoleClaim
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roles = RoleClaim::default();

    for raw in raw_roles {
        let Some(component) = raw.as_ref().strip_prefix(COMPONENTS_PREFIX) else {
            continue;
        };
        let mut parts = component.split(':');
        let org = normalize_org_path(parts.next().unwrap_or_default());
        let token = parts.next();

        let current = roles.get(&org).map(str::to_owned);
        match token {
            Some(PROVIDER_ROLE_TOKEN) => roles.insert(org, Role::Admin.to_string()),
            Some(EDITOR_ROLE_TOKEN) if current.as_deref() != Some(Role::Admin.as_str()) => {
                roles.insert(org, Role::Editor.to_string())
            }
            _ if current.is_none() => roles.insert(org, Role::Viewer.to_string()),
            _ => {}
        }
    }

    roles
}

fn normalize_org_path(path: &str) -> String {
    path.replace('/', "_").replacen('.', "_", 1)
}

/// Organization role understood by the downstream application.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}
