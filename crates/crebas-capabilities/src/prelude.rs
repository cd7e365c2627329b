//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crebas_capabilities::prelude::*;` to import all essential types.

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Identifiers
pub use crate::{AppId, CapabilityId, RequestId, UserGrantPolicyId, VendorId};

// Model
pub use crate::{
    AppCertificate, CapReqPendingResponse, CapReqResponse, Capability,
    CapabilityAttributeBasedPolicy, CapabilityName, CapabilityRequest, GrantCondition,
    Principal, UserGrantPolicy,
};

// Store
pub use crate::{CapabilityQuery, CapabilityStore, PolicyQuery, Query};

// Decisions
pub use crate::{GrantEvaluator, delegate, grant_from, is_domain_allowed};
