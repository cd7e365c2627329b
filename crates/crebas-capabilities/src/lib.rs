//! CREBAS Capabilities - the capability model and grant decisions.
//!
//! This crate provides:
//! - Capabilities, capability requests, user grant policies, and participant
//!   certificates, with their JSON wire shapes
//! - Canonical signing and verification of capabilities and requests
//! - An in-memory store of keyed collections with typed queries
//! - The grant policy evaluator and the delegation primitives
//!
//! # Grant flow
//!
//! Apps offer root capabilities (self-authorizing, signed by the app). A
//! request names a capability; every offered root with that name is a
//! candidate. A candidate is granted when a user grant policy allows it, or
//! when no policy exists and its grant condition permits it. Grants point
//! back at their authorizer, so every grant traces to an app's offer.
//!
//! # Example
//!
//! ```no_run
//! use crebas_capabilities::prelude::*;
//! use crebas_crypto::KeyPair;
//!
//! let app = Principal::new(AppId::new(), KeyPair::generate().unwrap());
//! let authority = Principal::new(AppId::new(), KeyPair::generate().unwrap());
//!
//! let mut offer = Capability::root(app.id(), CapabilityName::Temperature, "room-1")
//!     .with_condition(GrantCondition::Always);
//! offer.sign(&app).unwrap();
//!
//! let request = CapabilityRequest::new(AppId::new(), authority.id(), "Temperature", "room-1");
//! let grants = GrantEvaluator::new(&authority)
//!     .evaluate(&request, &[offer], &[])
//!     .unwrap();
//! assert_eq!(grants.len(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod capability;
mod certificate;
mod delegation;
mod domain;
mod encoding;
mod error;
mod evaluator;
mod ids;
mod policy;
mod principal;
mod query;
mod request;
mod store;

pub use capability::{
    Capability, CapabilityAttributeBasedPolicy, CapabilityName, CapabilitySignature,
    GrantCondition, RequesterAttribute,
};
pub use certificate::AppCertificate;
pub use delegation::{delegate, grant_from, granted_value};
pub use domain::{is_domain_allowed, normalize_domain};
pub use error::{CapabilityError, CapabilityResult};
pub use evaluator::{Eligibility, GrantEvaluator};
pub use ids::{AppId, CapabilityId, RequestId, UserGrantPolicyId, VendorId};
pub use policy::UserGrantPolicy;
pub use principal::Principal;
pub use query::{CapabilityQuery, PolicyQuery};
pub use request::{CapReqPendingResponse, CapReqResponse, CapabilityRequest};
pub use store::{CapabilityStore, Collection, Keyed, Query};
