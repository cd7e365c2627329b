//! Deriving capabilities from their authorizers.
//!
//! Every derived capability gets a fresh id, keeps the app and name of its
//! authorizer, points back at it, and is signed by its issuer.

use crate::capability::{Capability, CapabilityName};
use crate::domain::normalize_domain;
use crate::error::CapabilityResult;
use crate::ids::AppId;
use crate::principal::Principal;
use crate::request::CapabilityRequest;

/// Hand `cap` on from `from` to `to`, keeping its value.
///
/// # Errors
///
/// Returns [`CapabilityError::Crypto`](crate::CapabilityError::Crypto) if
/// signing fails.
pub fn delegate(cap: &Capability, from: &Principal, to: AppId) -> CapabilityResult<Capability> {
    let delegated = issue(cap, from, to, cap.capability_value.clone())?;
    tracing::debug!(
        authorizer = %cap.capability_id,
        capability_id = %delegated.capability_id,
        from = %from.id(),
        %to,
        "capability delegated"
    );
    Ok(delegated)
}

/// Grant `authorizer` to the requester of `request`, signed by `issuer`.
///
/// The value follows the request for `ExternalCommunication` and the
/// authorizer otherwise. No domain check is applied; callers that need one
/// perform it first.
///
/// # Errors
///
/// Returns [`CapabilityError::Crypto`](crate::CapabilityError::Crypto) if
/// signing fails.
pub fn grant_from(
    authorizer: &Capability,
    issuer: &Principal,
    request: &CapabilityRequest,
) -> CapabilityResult<Capability> {
    issue(
        authorizer,
        issuer,
        request.requester_id,
        granted_value(authorizer, request),
    )
}

/// The value a grant of `cap` to `request` carries.
///
/// Requested domains are stored in canonical form, so spellings that match
/// the same scope share one grant.
#[must_use]
pub fn granted_value(cap: &Capability, request: &CapabilityRequest) -> String {
    if cap.capability_name == CapabilityName::ExternalCommunication {
        normalize_domain(&request.request_capability_value)
    } else {
        cap.capability_value.clone()
    }
}

fn issue(
    authorizer: &Capability,
    issuer: &Principal,
    assignee: AppId,
    value: String,
) -> CapabilityResult<Capability> {
    let mut derived = authorizer.derive(issuer.id(), assignee, value);
    derived.sign(issuer)?;
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::GrantCondition;
    use crebas_test::{test_app_key, test_cp_key, test_user_key};

    fn offer(name: CapabilityName, value: &str) -> (Principal, Capability) {
        let app = Principal::new(AppId::new(), test_app_key(2));
        let mut cap = Capability::root(app.id(), name, value).with_condition(GrantCondition::Always);
        cap.sign(&app).unwrap();
        (app, cap)
    }

    #[test]
    fn test_delegate_chain() {
        let (_, root) = offer(CapabilityName::Humidity, "greenhouse");
        let cp = Principal::new(AppId::new(), test_cp_key());
        let user = AppId::new();

        let delegated = delegate(&root, &cp, user).unwrap();

        assert!(!delegated.is_root());
        assert_eq!(delegated.authorize_capability_id, root.capability_id);
        assert_eq!(delegated.assigner_id, cp.id());
        assert_eq!(delegated.assignee_id, user);
        assert_eq!(delegated.app_id, root.app_id);
        assert_eq!(delegated.capability_name, root.capability_name);
        assert_eq!(delegated.capability_value, root.capability_value);
        assert_eq!(delegated.grant_condition, GrantCondition::None);
        assert!(delegated.verify(cp.public_key()).is_ok());
        assert!(delegated.check_well_formed().is_ok());
    }

    #[test]
    fn test_grant_from_delegation() {
        let (_, root) = offer(CapabilityName::Temperature, "room-1");
        let cp = Principal::new(AppId::new(), test_cp_key());
        let user = Principal::new(AppId::new(), test_user_key());
        let request = CapabilityRequest::new(AppId::new(), cp.id(), "Temperature", "ignored");

        let delegated = delegate(&root, &cp, user.id()).unwrap();
        let grant = grant_from(&delegated, &user, &request).unwrap();

        assert_eq!(grant.assigner_id, user.id());
        assert_eq!(grant.assignee_id, request.requester_id);
        assert_eq!(grant.authorize_capability_id, delegated.capability_id);
        assert_eq!(grant.capability_value, "room-1");
        assert!(grant.verify(user.public_key()).is_ok());
    }

    #[test]
    fn test_external_communication_takes_requested_value() {
        let (_, root) = offer(CapabilityName::ExternalCommunication, "*.example.com");
        let request = CapabilityRequest::new(
            AppId::new(),
            AppId::new(),
            CapabilityName::ExternalCommunication,
            "unrelated.org",
        );

        assert_eq!(granted_value(&root, &request), "unrelated.org");
    }

    #[test]
    fn test_requested_domain_is_canonical() {
        let (_, root) = offer(CapabilityName::ExternalCommunication, "*.hoge.example.com");
        let upper = CapabilityRequest::new(
            AppId::new(),
            AppId::new(),
            CapabilityName::ExternalCommunication,
            "API.hoge.example.com.",
        );
        let lower = CapabilityRequest::new(
            AppId::new(),
            AppId::new(),
            CapabilityName::ExternalCommunication,
            "api.hoge.example.com",
        );

        assert_eq!(granted_value(&root, &upper), "api.hoge.example.com");
        assert_eq!(granted_value(&root, &upper), granted_value(&root, &lower));
    }
}
