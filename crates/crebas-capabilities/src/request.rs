//! Capability requests and their responses.

use crebas_crypto::{PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilityName, CapabilitySignature};
use crate::encoding::{signing_header, write_length_prefixed, write_optional};
use crate::error::{CapabilityError, CapabilityResult};
use crate::ids::{AppId, CapabilityId, RequestId, VendorId};
use crate::principal::Principal;

/// A signed request for a named capability.
///
/// The granted set accumulates server-side across resubmissions and is
/// reported through [`CapReqResponse`]; it never travels inside the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Unique request identifier; resubmissions reuse it.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// App asking for the capability.
    #[serde(rename = "requesterID")]
    pub requester_id: AppId,
    /// Authority the request is addressed to.
    #[serde(rename = "requesteeID")]
    pub requestee_id: AppId,
    /// Requested capability name.
    #[serde(rename = "requestCapability")]
    pub request_capability_name: CapabilityName,
    /// Requested scope.
    #[serde(rename = "requestCapabilityValue")]
    pub request_capability_value: String,
    /// Requesting device, matched by `DeviceID` policies.
    #[serde(rename = "deviceID", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<AppId>,
    /// Requesting device's vendor, matched by `VendorID` policies.
    #[serde(rename = "vendorID", default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<VendorId>,
    /// Capability the requester has in mind. Signed, never evaluated.
    #[serde(rename = "capabilityID", default, skip_serializing_if = "Option::is_none")]
    pub capability_id: Option<CapabilityId>,
    /// Signature by the requester.
    #[serde(rename = "requestSignature", default)]
    pub request_signature: CapabilitySignature,
    #[serde(skip)]
    granted_capabilities: Vec<Capability>,
}

impl CapabilityRequest {
    /// Create an unsigned request.
    #[must_use]
    pub fn new(
        requester_id: AppId,
        requestee_id: AppId,
        name: impl Into<CapabilityName>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            requester_id,
            requestee_id,
            request_capability_name: name.into(),
            request_capability_value: value.into(),
            device_id: None,
            vendor_id: None,
            capability_id: None,
            request_signature: CapabilitySignature::default(),
            granted_capabilities: Vec::new(),
        }
    }

    /// Attach the requesting device.
    #[must_use]
    pub fn with_device(mut self, device_id: AppId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Attach the requesting device's vendor.
    #[must_use]
    pub fn with_vendor(mut self, vendor_id: VendorId) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    /// Name the capability the requester has in mind.
    #[must_use]
    pub fn with_capability_hint(mut self, capability_id: CapabilityId) -> Self {
        self.capability_id = Some(capability_id);
        self
    }

    /// Get the data used for signing (excludes the signature bytes and the
    /// granted set).
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = signing_header("crebas.capability-request");

        write_length_prefixed(&mut data, self.request_id.as_bytes());
        write_length_prefixed(&mut data, self.requester_id.as_bytes());
        write_length_prefixed(&mut data, self.requestee_id.as_bytes());
        write_length_prefixed(&mut data, self.request_capability_name.as_str().as_bytes());
        write_length_prefixed(&mut data, self.request_capability_value.as_bytes());
        write_optional(&mut data, self.device_id.as_ref().map(|id| id.as_bytes().as_slice()));
        write_optional(&mut data, self.vendor_id.as_ref().map(|id| id.as_bytes().as_slice()));
        write_optional(
            &mut data,
            self.capability_id.as_ref().map(|id| id.as_bytes().as_slice()),
        );
        write_length_prefixed(&mut data, self.request_signature.signer_id.as_bytes());
        write_length_prefixed(&mut data, self.request_signature.signee_id.as_bytes());

        data
    }

    /// Sign as `signer`, addressing the signature to the requestee.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Crypto`] if the RSA operation fails.
    pub fn sign(&mut self, signer: &Principal) -> CapabilityResult<()> {
        self.request_signature = CapabilitySignature {
            signer_id: signer.id(),
            signee_id: self.requestee_id,
            signature: Signature::empty(),
        };
        self.request_signature.signature = signer.sign(&self.signing_data())?;
        Ok(())
    }

    /// Verify the signature against the requester's public key.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidSignature`] on mismatch, a malformed
    /// signature, or a signature made by someone other than the requester.
    pub fn verify(&self, public_key: &PublicKey) -> CapabilityResult<()> {
        let invalid = || CapabilityError::InvalidSignature {
            entity: format!("request {}", self.request_id),
        };
        if self.request_signature.signer_id != self.requester_id {
            return Err(invalid());
        }
        public_key
            .verify(&self.signing_data(), &self.request_signature.signature)
            .map_err(|_| invalid())
    }

    /// Whether the request already holds a grant with the same scope.
    #[must_use]
    pub fn holds_scope(&self, grant: &Capability) -> bool {
        self.granted_capabilities
            .iter()
            .any(|held| held.same_scope(grant))
    }

    /// Record a grant unless one with the same scope is already held.
    ///
    /// Returns `true` if the grant was added.
    pub fn record_grant(&mut self, grant: Capability) -> bool {
        if self.holds_scope(&grant) {
            return false;
        }
        self.granted_capabilities.push(grant);
        true
    }

    /// Grants accumulated so far, in grant order.
    #[must_use]
    pub fn granted_capabilities(&self) -> &[Capability] {
        &self.granted_capabilities
    }
}

impl PartialEq for CapabilityRequest {
    fn eq(&self, other: &Self) -> bool {
        self.request_id == other.request_id
    }
}

impl Eq for CapabilityRequest {}

/// A request together with grants.
///
/// Returned by request submission (the full accumulated set) and by manual
/// grants (the single new grant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapReqResponse {
    /// The request.
    pub request: CapabilityRequest,
    /// Grants reported for it.
    pub granted_capabilities: Vec<Capability>,
}

impl CapReqResponse {
    /// Report every grant the request has accumulated.
    #[must_use]
    pub fn accumulated(request: CapabilityRequest) -> Self {
        let granted_capabilities = request.granted_capabilities().to_vec();
        Self {
            request,
            granted_capabilities,
        }
    }
}

/// A request together with the root capabilities awaiting a manual decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapReqPendingResponse {
    /// The request.
    pub request: CapabilityRequest,
    /// Candidates for a manual grant.
    pub pending_capabilities: Vec<Capability>,
}
