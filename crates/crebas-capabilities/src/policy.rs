//! Human-operator grant overrides.

use serde::{Deserialize, Serialize};

use crate::ids::{AppId, CapabilityId, UserGrantPolicyId};

/// An allow/deny override scoped to one root capability and one requester.
///
/// Overrides take precedence over the capability's own grant condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrantPolicy {
    /// Unique policy identifier.
    #[serde(rename = "userGrantPolicyID")]
    pub user_grant_policy_id: UserGrantPolicyId,
    /// Root capability the override applies to.
    #[serde(rename = "capabilityID")]
    pub capability_id: CapabilityId,
    /// `true` to allow, `false` to deny.
    #[serde(rename = "grant")]
    pub grant: bool,
    /// Requester the override applies to.
    #[serde(rename = "targetAppID")]
    pub requester_id: AppId,
}

impl UserGrantPolicy {
    /// Create a policy with a fresh id.
    #[must_use]
    pub fn new(capability_id: CapabilityId, requester_id: AppId, grant: bool) -> Self {
        Self {
            user_grant_policy_id: UserGrantPolicyId::new(),
            capability_id,
            grant,
            requester_id,
        }
    }

    /// Allow `requester_id` to receive `capability_id`.
    #[must_use]
    pub fn allow(capability_id: CapabilityId, requester_id: AppId) -> Self {
        Self::new(capability_id, requester_id, true)
    }

    /// Deny `requester_id` the capability `capability_id`.
    #[must_use]
    pub fn deny(capability_id: CapabilityId, requester_id: AppId) -> Self {
        Self::new(capability_id, requester_id, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let policy = UserGrantPolicy::deny(CapabilityId::new(), AppId::new());
        let json = serde_json::to_value(&policy).unwrap();

        assert_eq!(json["grant"], false);
        assert_eq!(json["targetAppID"], policy.requester_id.0.to_string());
        assert!(json["userGrantPolicyID"].is_string());

        let decoded: UserGrantPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, policy);
    }
}
