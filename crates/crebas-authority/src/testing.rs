//! Fixtures shared by the unit tests.

use crebas_capabilities::{
    AppCertificate, AppId, Capability, CapabilityName, CapabilityRequest, GrantCondition,
    Principal,
};
use crebas_test::{test_app_key, test_cp_identity, test_pki, test_user_identity};

use crate::authority::Authority;
use crate::role::AuthorityIdentity;

/// A fresh app principal with a CA-issued certificate (not yet registered).
pub(crate) fn app_identity(index: usize) -> (Principal, AppCertificate) {
    let key = test_app_key(index);
    let principal = Principal::new(AppId::new(), key);
    let certificate = test_pki().issue(&format!("app-{index}"), principal.key());
    let cert = AppCertificate::new(principal.id(), &certificate).unwrap();
    (principal, cert)
}

pub(crate) struct AuthorityFixture {
    pub(crate) authority: Authority,
}

impl AuthorityFixture {
    pub(crate) fn new() -> Self {
        crebas_test::init_test_logging();
        let cp = test_cp_identity();
        let user = test_user_identity();
        let authority = Authority::new(
            test_pki().trust_anchor(),
            AuthorityIdentity::new(Principal::new(AppId::new(), cp.key), cp.certificate),
            AuthorityIdentity::new(Principal::new(AppId::new(), user.key), user.certificate),
        )
        .unwrap();
        Self { authority }
    }

    pub(crate) fn register_app(&self, index: usize) -> Principal {
        let (principal, cert) = app_identity(index);
        self.authority.register_certificate(cert).unwrap();
        principal
    }

    pub(crate) fn offer(
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

    pub(crate) fn submit_offer(
        &self,
        app: &Principal,
        name: CapabilityName,
        value: &str,
        condition: GrantCondition,
    ) -> Capability {
        let offer = self.offer(app, name, value, condition);
        self.authority.submit_capability(offer).unwrap()
    }

    pub(crate) fn request(
        &self,
        requester: &Principal,
        name: CapabilityName,
        value: &str,
    ) -> CapabilityRequest {
        let mut request =
            CapabilityRequest::new(requester.id(), self.authority.cp_id(), name, value);
        request.sign(requester).unwrap();
        request
    }
}
