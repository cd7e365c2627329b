//! Typed queries over the store collections.

use crate::capability::{Capability, CapabilityName};
use crate::ids::{AppId, CapabilityId};
use crate::policy::UserGrantPolicy;
use crate::request::CapabilityRequest;
use crate::store::Query;

/// Conjunctive filter over capabilities. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityQuery {
    name: Option<CapabilityName>,
    app_id: Option<AppId>,
    assigner_id: Option<AppId>,
    assignee_id: Option<AppId>,
    authorized_by: Option<CapabilityId>,
    value: Option<String>,
    roots_only: bool,
}

impl CapabilityQuery {
    /// Match every capability.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to capabilities with this name.
    #[must_use]
    pub fn name(mut self, name: impl Into<CapabilityName>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict to capabilities about this app.
    #[must_use]
    pub fn app(mut self, app_id: AppId) -> Self {
        self.app_id = Some(app_id);
        self
    }

    /// Restrict to capabilities issued by this principal.
    #[must_use]
    pub fn assigner(mut self, assigner_id: AppId) -> Self {
        self.assigner_id = Some(assigner_id);
        self
    }

    /// Restrict to capabilities held by this principal.
    #[must_use]
    pub fn assignee(mut self, assignee_id: AppId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    /// Restrict to capabilities authorized by this capability.
    #[must_use]
    pub fn authorized_by(mut self, capability_id: CapabilityId) -> Self {
        self.authorized_by = Some(capability_id);
        self
    }

    /// Restrict to capabilities with this value.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Restrict to self-authorizing capabilities.
    #[must_use]
    pub fn roots(mut self) -> Self {
        self.roots_only = true;
        self
    }

    /// Restrict to capabilities with the same `(authorizer, value)` scope as
    /// `grant`.
    #[must_use]
    pub fn same_scope(self, grant: &Capability) -> Self {
        self.authorized_by(grant.authorize_capability_id)
            .value(grant.capability_value.clone())
    }

    /// Capabilities a request could be granted from: roots with the
    /// requested name.
    #[must_use]
    pub fn candidates_for(request: &CapabilityRequest) -> Self {
        Self::new()
            .name(request.request_capability_name.clone())
            .roots()
    }
}

impl Query<Capability> for CapabilityQuery {
    fn matches(&self, cap: &Capability) -> bool {
        self.name.as_ref().is_none_or(|name| *name == cap.capability_name)
            && self.app_id.is_none_or(|id| id == cap.app_id)
            && self.assigner_id.is_none_or(|id| id == cap.assigner_id)
            && self.assignee_id.is_none_or(|id| id == cap.assignee_id)
            && self
                .authorized_by
                .is_none_or(|id| id == cap.authorize_capability_id)
            && self
                .value
                .as_ref()
                .is_none_or(|value| *value == cap.capability_value)
            && (!self.roots_only || cap.is_root())
    }
}

/// Overrides for one capability and one requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyQuery {
    capability_id: CapabilityId,
    requester_id: AppId,
}

impl PolicyQuery {
    /// Match overrides of `capability_id` for `requester_id`.
    #[must_use]
    pub fn new(capability_id: CapabilityId, requester_id: AppId) -> Self {
        Self {
            capability_id,
            requester_id,
        }
    }
}

impl Query<UserGrantPolicy> for PolicyQuery {
    fn matches(&self, policy: &UserGrantPolicy) -> bool {
        policy.capability_id == self.capability_id && policy.requester_id == self.requester_id
    }
}
