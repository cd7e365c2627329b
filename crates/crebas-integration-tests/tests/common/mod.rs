//! Shared harness for the integration tests.

use crebas_authority::{Authority, AuthorityIdentity, AuthorityRole};
use crebas_capabilities::{
    AppCertificate, AppId, Capability, CapabilityName, CapabilityRequest, GrantCondition,
    Principal,
};
use crebas_crypto::PublicKey;
use crebas_test::{test_app_key, test_cp_identity, test_pki, test_user_identity};

/// A fresh authority with CA-issued control plane and operator identities.
#[allow(dead_code)]
pub struct Harness {
    /// The authority under test.
    pub authority: Authority,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        crebas_test::init_test_logging();
        let cp = test_cp_identity();
        let user = test_user_identity();
        let authority = Authority::new(
            test_pki().trust_anchor(),
            AuthorityIdentity::new(Principal::new(AppId::new(), cp.key), cp.certificate),
            AuthorityIdentity::new(Principal::new(AppId::new(), user.key), user.certificate),
        )
        .expect("test identities are CA-issued");
        Self { authority }
    }

    /// A new app principal whose certificate is already registered.
    pub fn app(&self, index: usize) -> Principal {
        let principal = Principal::new(AppId::new(), test_app_key(index));
        let certificate = test_pki().issue(&format!("app-{index}"), principal.key());
        let cert = AppCertificate::new(principal.id(), &certificate).unwrap();
        self.authority.register_certificate(cert).unwrap();
        principal
    }

    /// A signed root offer by `app`.
    pub fn offer(
        &self,
        app: &Principal,
        name: CapabilityName,
        value: &str,
        condition: GrantCondition,
    ) -> Capability {
        let mut offer = Capability::root(app.id(), name, value).with_condition(condition);
        offer.sign(app).unwrap();
        offer
    }

    /// Sign and submit a root offer by `app`.
    pub fn publish(
        &self,
        app: &Principal,
        name: CapabilityName,
        value: &str,
        condition: GrantCondition,
    ) -> Capability {
        let offer = self.offer(app, name, value, condition);
        self.authority.submit_capability(offer).unwrap()
    }

    /// An unsigned request by `requester`, addressed to the control plane.
    pub fn unsigned_request(
        &self,
        requester: &Principal,
        name: CapabilityName,
        value: &str,
    ) -> CapabilityRequest {
        CapabilityRequest::new(requester.id(), self.authority.cp_id(), name, value)
    }

    /// A signed request by `requester`.
    pub fn request(
        &self,
        requester: &Principal,
        name: CapabilityName,
        value: &str,
    ) -> CapabilityRequest {
        let mut request = self.unsigned_request(requester, name, value);
        request.sign(requester).unwrap();
        request
    }

    /// Public key from one of the authority's published certificates.
    pub fn authority_key(&self, role: AuthorityRole) -> PublicKey {
        self.authority
            .fetch_authority_certificate(role)
            .unwrap()
            .public_key()
            .unwrap()
    }
}
