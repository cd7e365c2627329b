//! Grant policy evaluation.
//!
//! Decides which offered capabilities a request is automatically granted.
//! Evaluation is pure over snapshots of the offered capabilities and the
//! user grant policies; committing the result is the caller's job.

use crate::capability::{Capability, CapabilityName, GrantCondition};
use crate::delegation::{grant_from, granted_value};
use crate::domain::is_domain_allowed;
use crate::error::{CapabilityError, CapabilityResult};
use crate::policy::UserGrantPolicy;
use crate::principal::Principal;
use crate::query::{CapabilityQuery, PolicyQuery};
use crate::request::CapabilityRequest;
use crate::store::Query;

/// Why a candidate is or is not eligible for an automatic grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// A user grant policy allows it.
    OverrideAllow,
    /// A user grant policy denies it.
    OverrideDeny,
    /// The capability is granted to everyone.
    Always,
    /// The conditional policy matched the requester.
    ConditionMatched,
    /// The conditional policy did not match the requester.
    ConditionUnmatched,
    /// The capability is never granted automatically.
    Never,
}

impl Eligibility {
    /// Whether a grant may be materialized.
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(
            self,
            Self::OverrideAllow | Self::Always | Self::ConditionMatched
        )
    }
}

/// Evaluates requests on behalf of the authority principal, which signs
/// every grant it materializes.
#[derive(Debug, Clone, Copy)]
pub struct GrantEvaluator<'a> {
    authority: &'a Principal,
}

impl<'a> GrantEvaluator<'a> {
    /// Create an evaluator signing as `authority`.
    #[must_use]
    pub fn new(authority: &'a Principal) -> Self {
        Self { authority }
    }

    /// Decide whether `cap` may be granted to `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::AmbiguousPolicy`] if more than one user
    /// grant policy targets `cap` and the requester.
    pub fn eligibility(
        &self,
        cap: &Capability,
        request: &CapabilityRequest,
        policies: &[UserGrantPolicy],
    ) -> CapabilityResult<Eligibility> {
        let query = PolicyQuery::new(cap.capability_id, request.requester_id);
        let mut overrides = policies.iter().filter(|policy| query.matches(policy));

        match (overrides.next(), overrides.count()) {
            (Some(policy), 0) => {
                return Ok(if policy.grant {
                    Eligibility::OverrideAllow
                } else {
                    Eligibility::OverrideDeny
                });
            },
            (Some(_), extra) => {
                return Err(CapabilityError::AmbiguousPolicy {
                    capability_id: cap.capability_id.to_string(),
                    requester_id: request.requester_id.to_string(),
                    count: extra.saturating_add(1),
                });
            },
            (None, _) => {},
        }

        Ok(match cap.grant_condition {
            GrantCondition::Always => Eligibility::Always,
            GrantCondition::None => Eligibility::Never,
            GrantCondition::Conditional => match &cap.grant_policy {
                Some(policy) if policy.matches(request) => Eligibility::ConditionMatched,
                _ => Eligibility::ConditionUnmatched,
            },
        })
    }

    /// Materialize the grants `request` is newly eligible for.
    ///
    /// Candidates are the root capabilities in `offered` with the requested
    /// name, in encounter order. Grants whose `(authorizer, value)` scope the
    /// request already holds are not produced again.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::AmbiguousPolicy`] if any candidate has
    /// conflicting overrides, or a crypto error if signing fails. No grants
    /// are returned on error.
    pub fn evaluate(
        &self,
        request: &CapabilityRequest,
        offered: &[Capability],
        policies: &[UserGrantPolicy],
    ) -> CapabilityResult<Vec<Capability>> {
        let candidates = CapabilityQuery::candidates_for(request);
        let mut grants: Vec<Capability> = Vec::new();

        for cap in offered.iter().filter(|cap| candidates.matches(cap)) {
            let eligibility = self.eligibility(cap, request, policies)?;
            if !eligibility.is_eligible() {
                tracing::debug!(
                    capability_id = %cap.capability_id,
                    request_id = %request.request_id,
                    ?eligibility,
                    "candidate not eligible"
                );
                continue;
            }

            if cap.capability_name == CapabilityName::ExternalCommunication
                && !is_domain_allowed(&cap.capability_value, &request.request_capability_value)
            {
                tracing::debug!(
                    capability_id = %cap.capability_id,
                    pattern = %cap.capability_value,
                    requested = %request.request_capability_value,
                    "requested domain outside capability scope"
                );
                continue;
            }

            let value = granted_value(cap, request);
            let held = |g: &Capability| {
                g.authorize_capability_id == cap.capability_id && g.capability_value == value
            };
            if request.granted_capabilities().iter().any(&held) || grants.iter().any(&held) {
                continue;
            }

            let grant = grant_from(cap, self.authority, request)?;

            tracing::debug!(
                capability_id = %grant.capability_id,
                authorizer = %cap.capability_id,
                request_id = %request.request_id,
                ?eligibility,
                "grant materialized"
            );
            grants.push(grant);
        }

        Ok(grants)
    }
}
