//! Capabilities - signed, scoped grants of a named right.
//!
//! A capability is either:
//! - a **root** offer, created and signed by the app it describes, whose
//!   `authorize_capability_id` equals its own id; or
//! - a **derived** capability (an automatic grant, a delegation, or a manual
//!   grant) created by the authority or a delegate, whose
//!   `authorize_capability_id` points at its immediate authorizer.
//!
//! Capabilities are immutable once signed and are never deleted.

use crebas_crypto::{ContentHash, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::encoding::{signing_header, write_length_prefixed, write_optional};
use crate::error::{CapabilityError, CapabilityResult};
use crate::ids::{AppId, CapabilityId, VendorId};
use crate::principal::Principal;
use crate::request::CapabilityRequest;

/// Name of the right a capability grants.
///
/// Unknown names are kept verbatim so new capability kinds can be offered
/// without an authority upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CapabilityName {
    /// Talk to hosts outside the platform; the value is a domain pattern.
    ExternalCommunication,
    /// Read a temperature sensor.
    Temperature,
    /// Read a humidity sensor.
    Humidity,
    /// Discover neighboring apps and devices.
    NeighborDiscovery,
    /// Any other capability name.
    Other(String),
}

impl CapabilityName {
    /// The wire form of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExternalCommunication => "ExternalCommunication",
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::NeighborDiscovery => "NeighborDiscovery",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for CapabilityName {
    fn from(name: String) -> Self {
        match name.as_str() {
            "ExternalCommunication" => Self::ExternalCommunication,
            "Temperature" => Self::Temperature,
            "Humidity" => Self::Humidity,
            "NeighborDiscovery" => Self::NeighborDiscovery,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for CapabilityName {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<CapabilityName> for String {
    fn from(name: CapabilityName) -> Self {
        match name {
            CapabilityName::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the authority may grant a capability without human involvement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantCondition {
    /// Grant to every matching request.
    Always,
    /// Never grant automatically; a user override or manual grant is required.
    #[default]
    #[serde(alias = "")]
    None,
    /// Grant when the attached attribute-based policy matches the requester.
    Conditional,
}

impl fmt::Display for GrantCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::None => write!(f, "none"),
            Self::Conditional => write!(f, "conditional"),
        }
    }
}

/// Requester attribute a conditional policy tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequesterAttribute {
    /// Match on the requesting device.
    #[serde(rename = "DeviceID")]
    DeviceId,
    /// Match on the requesting device's vendor.
    #[serde(rename = "VendorID")]
    VendorId,
}

impl fmt::Display for RequesterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceId => write!(f, "DeviceID"),
            Self::VendorId => write!(f, "VendorID"),
        }
    }
}

/// Attribute-based condition attached to a `conditional` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityAttributeBasedPolicy {
    /// Which requester attribute to test.
    #[serde(rename = "requesterAttribute")]
    pub requester_attribute: RequesterAttribute,
    /// Expected device when testing [`RequesterAttribute::DeviceId`].
    #[serde(
        rename = "requesterDeviceID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requester_device_id: Option<AppId>,
    /// Expected vendor when testing [`RequesterAttribute::VendorId`].
    #[serde(
        rename = "requesterVendorID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requester_vendor_id: Option<VendorId>,
}

impl CapabilityAttributeBasedPolicy {
    /// Policy matching requests from one device.
    #[must_use]
    pub fn device(device_id: AppId) -> Self {
        Self {
            requester_attribute: RequesterAttribute::DeviceId,
            requester_device_id: Some(device_id),
            requester_vendor_id: None,
        }
    }

    /// Policy matching requests from devices of one vendor.
    #[must_use]
    pub fn vendor(vendor_id: VendorId) -> Self {
        Self {
            requester_attribute: RequesterAttribute::VendorId,
            requester_device_id: None,
            requester_vendor_id: Some(vendor_id),
        }
    }

    /// Whether the request's context attribute equals the expected one.
    ///
    /// A request that does not carry the tested attribute never matches.
    #[must_use]
    pub fn matches(&self, request: &CapabilityRequest) -> bool {
        match self.requester_attribute {
            RequesterAttribute::DeviceId => {
                self.requester_device_id.is_some() && self.requester_device_id == request.device_id
            },
            RequesterAttribute::VendorId => {
                self.requester_vendor_id.is_some() && self.requester_vendor_id == request.vendor_id
            },
        }
    }

    fn check_well_formed(&self) -> CapabilityResult<()> {
        let present = match self.requester_attribute {
            RequesterAttribute::DeviceId => self.requester_device_id.is_some(),
            RequesterAttribute::VendorId => self.requester_vendor_id.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(CapabilityError::Malformed(format!(
                "grant policy tests {} but carries no expected value",
                self.requester_attribute
            )))
        }
    }

    fn write_signing_data(&self, data: &mut Vec<u8>) {
        write_length_prefixed(data, self.requester_attribute.to_string().as_bytes());
        write_optional(
            data,
            self.requester_device_id.as_ref().map(|id| id.as_bytes().as_slice()),
        );
        write_optional(
            data,
            self.requester_vendor_id.as_ref().map(|id| id.as_bytes().as_slice()),
        );
    }
}

/// Signature envelope shared by capabilities and requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySignature {
    /// Principal that produced the signature.
    #[serde(rename = "signerID")]
    pub signer_id: AppId,
    /// Principal the signed entity is addressed to.
    #[serde(rename = "signeeID")]
    pub signee_id: AppId,
    /// RSA PKCS#1 v1.5 signature, base64 on the wire.
    #[serde(rename = "signature")]
    pub signature: Signature,
}

impl Default for CapabilitySignature {
    fn default() -> Self {
        Self {
            signer_id: AppId::from_uuid(Uuid::nil()),
            signee_id: AppId::from_uuid(Uuid::nil()),
            signature: Signature::empty(),
        }
    }
}

/// A signed, scoped grant of a named right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Unique capability identifier.
    #[serde(rename = "capabilityID")]
    pub capability_id: CapabilityId,
    /// Issuer.
    #[serde(rename = "assignerID")]
    pub assigner_id: AppId,
    /// Holder.
    #[serde(rename = "assigneeID")]
    pub assignee_id: AppId,
    /// Subject the right pertains to.
    #[serde(rename = "appID")]
    pub app_id: AppId,
    /// Name of the right.
    #[serde(rename = "capabilityName")]
    pub capability_name: CapabilityName,
    /// Opaque scope (a domain pattern for `ExternalCommunication`).
    #[serde(rename = "capabilityValue")]
    pub capability_value: String,
    /// Automatic grant condition.
    #[serde(rename = "grantCondition", default)]
    pub grant_condition: GrantCondition,
    /// Policy consulted when `grant_condition` is `conditional`.
    #[serde(
        rename = "grantPolicy",
        alias = "capabilityGrantPolicy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub grant_policy: Option<CapabilityAttributeBasedPolicy>,
    /// Capability that authorized this one; equals `capability_id` for roots.
    #[serde(rename = "authorizeCapabilityID")]
    pub authorize_capability_id: CapabilityId,
    /// Signature over the canonical encoding.
    #[serde(rename = "capabilitySignature", default)]
    pub capability_signature: CapabilitySignature,
}

impl Capability {
    /// Create an unsigned root capability that `app_id` offers about itself.
    #[must_use]
    pub fn root(
        app_id: AppId,
        name: impl Into<CapabilityName>,
        value: impl Into<String>,
    ) -> Self {
        let capability_id = CapabilityId::new();
        Self {
            capability_id,
            assigner_id: app_id,
            assignee_id: app_id,
            app_id,
            capability_name: name.into(),
            capability_value: value.into(),
            grant_condition: GrantCondition::None,
            grant_policy: None,
            authorize_capability_id: capability_id,
            capability_signature: CapabilitySignature::default(),
        }
    }

    /// Set the holder.
    #[must_use]
    pub fn with_assignee(mut self, assignee_id: AppId) -> Self {
        self.assignee_id = assignee_id;
        self
    }

    /// Set the grant condition (clearing any policy unless `conditional`).
    #[must_use]
    pub fn with_condition(mut self, condition: GrantCondition) -> Self {
        self.grant_condition = condition;
        if condition != GrantCondition::Conditional {
            self.grant_policy = None;
        }
        self
    }

    /// Attach an attribute-based policy, making the capability `conditional`.
    #[must_use]
    pub fn with_policy(mut self, policy: CapabilityAttributeBasedPolicy) -> Self {
        self.grant_condition = GrantCondition::Conditional;
        self.grant_policy = Some(policy);
        self
    }

    /// Whether this capability authorizes itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.authorize_capability_id == self.capability_id
    }

    /// Whether `other` grants the same scope under the same authorizer.
    #[must_use]
    pub fn same_scope(&self, other: &Capability) -> bool {
        self.authorize_capability_id == other.authorize_capability_id
            && self.capability_value == other.capability_value
    }

    /// A fresh, unsigned capability derived from this one.
    ///
    /// Derived capabilities never carry a grant condition or policy of
    /// their own.
    #[must_use]
    pub(crate) fn derive(&self, assigner_id: AppId, assignee_id: AppId, value: String) -> Self {
        Self {
            capability_id: CapabilityId::new(),
            assigner_id,
            assignee_id,
            app_id: self.app_id,
            capability_name: self.capability_name.clone(),
            capability_value: value,
            grant_condition: GrantCondition::None,
            grant_policy: None,
            authorize_capability_id: self.capability_id,
            capability_signature: CapabilitySignature::default(),
        }
    }

    /// Get the data used for signing (excludes the signature bytes).
    ///
    /// Format (v1):
    /// - 1 byte: version (0x01)
    /// - Length-prefixed domain tag `crebas.capability`
    /// - Length-prefixed capability, assigner, assignee, and app IDs
    /// - Length-prefixed name, value, and grant condition strings
    /// - Optional grant policy (attribute, optional device, optional vendor)
    /// - Length-prefixed authorizing capability ID
    /// - Length-prefixed signer and signee IDs
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = signing_header("crebas.capability");

        write_length_prefixed(&mut data, self.capability_id.as_bytes());
        write_length_prefixed(&mut data, self.assigner_id.as_bytes());
        write_length_prefixed(&mut data, self.assignee_id.as_bytes());
        write_length_prefixed(&mut data, self.app_id.as_bytes());
        write_length_prefixed(&mut data, self.capability_name.as_str().as_bytes());
        write_length_prefixed(&mut data, self.capability_value.as_bytes());
        write_length_prefixed(&mut data, self.grant_condition.to_string().as_bytes());

        match &self.grant_policy {
            Some(policy) => {
                data.push(0x01);
                policy.write_signing_data(&mut data);
            },
            None => data.push(0x00),
        }

        write_length_prefixed(&mut data, self.authorize_capability_id.as_bytes());
        write_length_prefixed(&mut data, self.capability_signature.signer_id.as_bytes());
        write_length_prefixed(&mut data, self.capability_signature.signee_id.as_bytes());

        data
    }

    /// Sign as `signer`, addressing the signature to the assignee.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Crypto`] if the RSA operation fails.
    pub fn sign(&mut self, signer: &Principal) -> CapabilityResult<()> {
        self.capability_signature = CapabilitySignature {
            signer_id: signer.id(),
            signee_id: self.assignee_id,
            signature: Signature::empty(),
        };
        self.capability_signature.signature = signer.sign(&self.signing_data())?;
        Ok(())
    }

    /// Verify the signature against the signer's public key.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidSignature`] on mismatch or a
    /// malformed signature.
    pub fn verify(&self, public_key: &PublicKey) -> CapabilityResult<()> {
        public_key
            .verify(&self.signing_data(), &self.capability_signature.signature)
            .map_err(|_| CapabilityError::InvalidSignature {
                entity: format!("capability {}", self.capability_id),
            })
    }

    /// Check structural invariants that do not need any key.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Malformed`] if the name is empty, the
    /// policy does not match the grant condition, or the signer is not the
    /// assigner.
    pub fn check_well_formed(&self) -> CapabilityResult<()> {
        if self.capability_name.as_str().is_empty() {
            return Err(CapabilityError::Malformed(format!(
                "capability {} has an empty name",
                self.capability_id
            )));
        }

        match (&self.grant_condition, &self.grant_policy) {
            (GrantCondition::Conditional, Some(policy)) => policy.check_well_formed()?,
            (GrantCondition::Conditional, None) => {
                return Err(CapabilityError::Malformed(format!(
                    "capability {} is conditional but has no grant policy",
                    self.capability_id
                )));
            },
            (_, Some(_)) => {
                return Err(CapabilityError::Malformed(format!(
                    "capability {} carries a grant policy but is {}",
                    self.capability_id, self.grant_condition
                )));
            },
            (_, None) => {},
        }

        if self.capability_signature.signer_id != self.assigner_id {
            return Err(CapabilityError::Malformed(format!(
                "capability {} is assigned by {} but signed by {}",
                self.capability_id, self.assigner_id, self.capability_signature.signer_id
            )));
        }

        Ok(())
    }

    /// Check that this is a well-formed root offer.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Malformed`] if the capability is derived
    /// or fails [`check_well_formed`](Self::check_well_formed).
    pub fn check_offer(&self) -> CapabilityResult<()> {
        if !self.is_root() {
            return Err(CapabilityError::Malformed(format!(
                "offered capability {} is not self-authorizing (authorized by {})",
                self.capability_id, self.authorize_capability_id
            )));
        }
        self.check_well_formed()
    }

    /// Hash of the signing data, for logs.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.capability_id == other.capability_id
    }
}

impl Eq for Capability {}

impl std::hash::Hash for Capability {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.capability_id.hash(state);
    }
}
