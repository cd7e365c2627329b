//! JSON operation envelope.
//!
//! Each inbound operation is an [`Operation`] tagged
//! `{"op": "...", "params": ...}`; the authority answers with a [`Reply`]
//! tagged `{"status": "...", "data": ...}`. Errors never escape
//! [`Authority::dispatch`]; they come back as [`Reply::Error`].

use crebas_capabilities::{
    AppCertificate, CapReqPendingResponse, CapReqResponse, Capability, CapabilityId,
    CapabilityRequest, RequestId, UserGrantPolicy,
};
use crebas_telemetry::{RequestContext, RequestGuard};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::authority::Authority;
use crate::error::{AuthorityError, AuthorityResult, ErrorKind};
use crate::role::AuthorityRole;

/// An operation submitted to the authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "kebab-case")]
pub enum Operation {
    /// Offer root capabilities; each is accepted or rejected on its own.
    SubmitCapabilities(Vec<Capability>),
    /// Ask for a capability.
    SubmitCapabilityRequest(CapabilityRequest),
    /// Record a human override.
    SubmitUserGrantPolicy(UserGrantPolicy),
    /// List requests with the roots awaiting a manual decision.
    ListPendingRequests,
    /// Grant a root to a request on the operator's authority.
    GrantManually {
        /// The request.
        #[serde(rename = "requestID")]
        request_id: RequestId,
        /// The root capability.
        #[serde(rename = "capabilityID")]
        capability_id: CapabilityId,
    },
    /// Register a participant certificate.
    RegisterCertificate(AppCertificate),
    /// Fetch one of the authority's own certificates.
    FetchAuthorityCertificate {
        /// Which principal.
        role: AuthorityRole,
    },
    /// List offered capabilities.
    ListCapabilities,
    /// List self-authorizing offered capabilities.
    ListRootCapabilities,
    /// List grants and delegations.
    ListGrantedCapabilities,
    /// List requests with their accumulated grants.
    ListRequests,
}

impl Operation {
    /// The operation's wire name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitCapabilities(_) => "submit-capabilities",
            Self::SubmitCapabilityRequest(_) => "submit-capability-request",
            Self::SubmitUserGrantPolicy(_) => "submit-user-grant-policy",
            Self::ListPendingRequests => "list-pending-requests",
            Self::GrantManually { .. } => "grant-manually",
            Self::RegisterCertificate(_) => "register-certificate",
            Self::FetchAuthorityCertificate { .. } => "fetch-authority-certificate",
            Self::ListCapabilities => "list-capabilities",
            Self::ListRootCapabilities => "list-root-capabilities",
            Self::ListGrantedCapabilities => "list-granted-capabilities",
            Self::ListRequests => "list-requests",
        }
    }

    /// The participant the operation is on behalf of, when it names one.
    #[must_use]
    pub fn principal(&self) -> Option<String> {
        match self {
            Self::SubmitCapabilityRequest(request) => Some(request.requester_id.to_string()),
            Self::SubmitUserGrantPolicy(policy) => Some(policy.requester_id.to_string()),
            Self::RegisterCertificate(cert) => Some(cert.app_id.to_string()),
            _ => None,
        }
    }

    /// Parse one operation, or a JSON array of operations.
    ///
    /// # Errors
    ///
    /// Returns a malformed-input error if the text is not valid JSON for an
    /// operation or a list of them.
    pub fn parse_batch(input: &str) -> AuthorityResult<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| AuthorityError::malformed(format!("operation JSON: {e}")))?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            single => vec![single],
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item)
                    .map_err(|e| AuthorityError::malformed(format!("operation {index}: {e}")))
            })
            .collect()
    }
}

/// The authority's answer to an [`Operation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "kebab-case")]
pub enum Reply {
    /// Capabilities (accepted offers, listings).
    Capabilities(Vec<Capability>),
    /// A request with grants.
    Granted(CapReqResponse),
    /// Requests with their accumulated grants.
    Requests(Vec<CapReqResponse>),
    /// Pending requests.
    Pending(Vec<CapReqPendingResponse>),
    /// A recorded policy.
    Policy(UserGrantPolicy),
    /// A certificate.
    Certificate(AppCertificate),
    /// The operation failed.
    Error {
        /// Classification.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl Reply {
    /// Whether this is an error reply.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<&AuthorityError> for Reply {
    fn from(err: &AuthorityError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl Authority {
    /// Run one operation inside its own logging context.
    pub fn dispatch(&self, op: Operation) -> Reply {
        let mut ctx = RequestContext::new("dispatch").with_operation(op.name());
        if let Some(principal) = op.principal() {
            ctx = ctx.with_principal(principal);
        }
        let _guard = RequestGuard::new(ctx);

        match self.execute(op) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "operation failed");
                Reply::from(&err)
            },
        }
    }

    fn execute(&self, op: Operation) -> AuthorityResult<Reply> {
        Ok(match op {
            Operation::SubmitCapabilities(offers) => {
                Reply::Capabilities(self.submit_capabilities(offers))
            },
            Operation::SubmitCapabilityRequest(request) => {
                Reply::Granted(self.submit_request(request)?)
            },
            Operation::SubmitUserGrantPolicy(policy) => {
                Reply::Policy(self.submit_user_grant_policy(policy))
            },
            Operation::ListPendingRequests => Reply::Pending(self.list_pending()),
            Operation::GrantManually {
                request_id,
                capability_id,
            } => Reply::Granted(self.grant_manually(request_id, capability_id)?),
            Operation::RegisterCertificate(cert) => {
                Reply::Certificate(self.register_certificate(cert)?)
            },
            Operation::FetchAuthorityCertificate { role } => {
                Reply::Certificate(self.fetch_authority_certificate(role)?)
            },
            Operation::ListCapabilities => Reply::Capabilities(self.list_capabilities()),
            Operation::ListRootCapabilities => Reply::Capabilities(self.list_root_capabilities()),
            Operation::ListGrantedCapabilities => Reply::Capabilities(self.list_granted()),
            Operation::ListRequests => Reply::Requests(
                self.list_requests()
                    .into_iter()
                    .map(CapReqResponse::accumulated)
                    .collect(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AuthorityFixture, app_identity};
    use crebas_capabilities::{CapabilityName, GrantCondition};
    use serde_json::json;

    #[test]
    fn test_operation_wire_shape() {
        let op = Operation::GrantManually {
            request_id: RequestId::new(),
            capability_id: CapabilityId::new(),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], "grant-manually");
        assert!(value["params"]["requestID"].is_string());
        assert!(value["params"]["capabilityID"].is_string());

        let unit: Operation = serde_json::from_value(json!({"op": "list-requests"})).unwrap();
        assert_eq!(unit.name(), "list-requests");
    }

    #[test]
    fn test_parse_batch() {
        let ops = Operation::parse_batch(
            r#"[{"op": "list-capabilities"}, {"op": "fetch-authority-certificate", "params": {"role": "user"}}]"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            ops[1],
            Operation::FetchAuthorityCertificate {
                role: AuthorityRole::User
            }
        ));

        assert_eq!(Operation::parse_batch(r#"{"op": "list-requests"}"#).unwrap().len(), 1);

        let err = Operation::parse_batch(r#"[{"op": "launch-missiles"}]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(err.to_string().contains("operation 0"));
    }

    #[test]
    fn test_dispatch_flow() {
        let fx = AuthorityFixture::new();
        let (app, cert) = app_identity(0);
        let (requester, requester_cert) = app_identity(1);

        for cert in [cert, requester_cert] {
            assert!(matches!(
                fx.authority.dispatch(Operation::RegisterCertificate(cert)),
                Reply::Certificate(_)
            ));
        }

        let offer = fx.offer(&app, CapabilityName::Temperature, "room", GrantCondition::Always);
        let Reply::Capabilities(accepted) =
            fx.authority.dispatch(Operation::SubmitCapabilities(vec![offer]))
        else {
            panic!("expected capabilities");
        };
        assert_eq!(accepted.len(), 1);

        let request = fx.request(&requester, CapabilityName::Temperature, "");
        let Reply::Granted(response) =
            fx.authority.dispatch(Operation::SubmitCapabilityRequest(request))
        else {
            panic!("expected grant");
        };
        assert_eq!(response.granted_capabilities.len(), 1);

        let Reply::Requests(requests) = fx.authority.dispatch(Operation::ListRequests) else {
            panic!("expected requests");
        };
        assert_eq!(requests[0].granted_capabilities.len(), 1);

        let Reply::Capabilities(granted) =
            fx.authority.dispatch(Operation::ListGrantedCapabilities)
        else {
            panic!("expected capabilities");
        };
        assert_eq!(granted.len(), 1);
    }

    #[test]
    fn test_dispatch_folds_errors() {
        let fx = AuthorityFixture::new();
        let reply = fx.authority.dispatch(Operation::GrantManually {
            request_id: RequestId::new(),
            capability_id: CapabilityId::new(),
        });

        assert!(reply.is_error());
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["data"]["kind"], "not-found");
    }
}
