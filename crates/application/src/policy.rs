//! Authorization-policy resolution.
//!
//! Endpoint annotations name a policy. Names carrying the `Perm:` prefix
//! resolve by convention into a single-permission requirement; everything
//! else falls back to the static registry populated at startup. An unknown
//! name is a configuration error, never an authorization outcome.

use std::collections::HashMap;

use tessera_core::{AppError, AppResult, AuthenticatedUser};

/// Prefix marking permission-convention policy names.
///
/// The prefix test is ASCII-case-insensitive; the permission suffix is
/// compared to `perm` claims exactly, case-sensitive, with no wildcarding.
pub const PERMISSION_POLICY_PREFIX: &str = "Perm:";

/// An executable authorization requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRequirement {
    /// Caller must only be authenticated.
    Authenticated,
    /// Caller must be authenticated and present the named `perm` claim.
    Permission(String),
    /// Caller must be authenticated and hold at least one listed role.
    AnyRole(Vec<String>),
}

impl PolicyRequirement {
    /// Evaluates the requirement against an authenticated caller.
    ///
    /// Authentication itself is upstream; by the time a requirement is
    /// evaluated the caller identity already exists, so `Authenticated`
    /// always passes here.
    #[must_use]
    pub fn evaluate(&self, user: &AuthenticatedUser) -> bool {
        match self {
            Self::Authenticated => true,
            Self::Permission(permission) => user.has_permission(permission),
            Self::AnyRole(roles) => roles.iter().any(|role| user.has_role(role)),
        }
    }
}

/// Resolves policy names into requirements.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    static_policies: HashMap<String, PolicyRequirement>,
}

impl PolicyResolver {
    /// Creates a resolver with an empty static registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a statically named policy.
    ///
    /// The registry is fixed at startup; resolution never mutates it.
    #[must_use]
    pub fn with_static_policy(
        mut self,
        name: impl Into<String>,
        requirement: PolicyRequirement,
    ) -> Self {
        self.static_policies.insert(name.into(), requirement);
        self
    }

    /// Resolves a policy name into a requirement.
    ///
    /// The mapping is pure: each `Perm:X` resolution yields an equivalent,
    /// freshly constructed requirement. Names that neither match the
    /// convention nor appear in the static registry surface as an internal
    /// configuration error.
    pub fn resolve(&self, policy_name: &str) -> AppResult<PolicyRequirement> {
        if let Some(permission) = strip_permission_prefix(policy_name)
            && !permission.is_empty()
        {
            return Ok(PolicyRequirement::Permission(permission.to_owned()));
        }

        self.static_policies
            .get(policy_name)
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "no authorization policy named '{policy_name}' is registered"
                ))
            })
    }
}

fn strip_permission_prefix(policy_name: &str) -> Option<&str> {
    let prefix = policy_name.get(..PERMISSION_POLICY_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(PERMISSION_POLICY_PREFIX) {
        policy_name.get(PERMISSION_POLICY_PREFIX.len()..)
    } else {
        None
    }
}
