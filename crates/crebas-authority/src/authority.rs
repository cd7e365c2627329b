//! The capability authority.
//!
//! [`Authority`] owns the store, the CA trust anchor and the two signing
//! principals. Every inbound operation is a method here; the JSON envelope in
//! [`crate::protocol`] routes onto the same methods.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crebas_capabilities::{
    AppCertificate, AppId, Capability, CapabilityError, CapabilityQuery, CapabilityRequest,
    CapabilityStore, Principal, UserGrantPolicy,
};
use crebas_crypto::TrustAnchor;
use tracing::{debug, info, warn};

use crate::error::{AuthorityError, AuthorityResult};
use crate::role::{AuthorityIdentity, AuthorityRole};

/// The capability authority: trust verification, storage and grant
/// decisions for one Control Provider.
///
/// `Authority` is `Send + Sync`; share it through an `Arc` and call it from
/// any number of threads.
pub struct Authority {
    pub(crate) store: CapabilityStore,
    trust: TrustAnchor,
    pub(crate) cp: Principal,
    pub(crate) user: Principal,
    /// Serializes evaluate-and-commit sequences.
    commit: Mutex<()>,
}

impl Authority {
    /// Create an authority from its CA and its two principals.
    ///
    /// Both certificates must chain to the CA and certify their principal's
    /// key. They are registered so that signatures by the authority can be
    /// verified like any other participant's.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Identity`] if a certificate is untrusted,
    /// certifies another key, or both principals share an id.
    pub fn new(
        trust: TrustAnchor,
        cp: AuthorityIdentity,
        user: AuthorityIdentity,
    ) -> AuthorityResult<Self> {
        for (role, identity) in [(AuthorityRole::Cp, &cp), (AuthorityRole::User, &user)] {
            trust
                .verify_binding(&identity.certificate, identity.principal.public_key())
                .map_err(|e| AuthorityError::Identity {
                    role,
                    reason: e.to_string(),
                })?;
        }

        if cp.principal.id() == user.principal.id() {
            return Err(AuthorityError::Identity {
                role: AuthorityRole::User,
                reason: format!("shares id {} with the Control Provider", cp.principal.id()),
            });
        }

        let store = CapabilityStore::new();
        for identity in [&cp, &user] {
            store.certificates().replace(AppCertificate::new(
                identity.principal.id(),
                &identity.certificate,
            )?);
        }

        info!(
            cp_id = %cp.principal.id(),
            user_id = %user.principal.id(),
            ca = %trust.root().subject(),
            "capability authority initialized"
        );

        Ok(Self {
            store,
            trust,
            cp: cp.principal,
            user: user.principal,
            commit: Mutex::new(()),
        })
    }

    /// The Control Provider's id.
    #[must_use]
    pub fn cp_id(&self) -> AppId {
        self.cp.id()
    }

    /// The human operator's id.
    #[must_use]
    pub fn user_id(&self) -> AppId {
        self.user.id()
    }

    /// The id of the principal playing `role`.
    #[must_use]
    pub fn principal_id(&self, role: AuthorityRole) -> AppId {
        match role {
            AuthorityRole::Cp => self.cp.id(),
            AuthorityRole::User => self.user.id(),
        }
    }

    /// The CA trust anchor.
    #[must_use]
    pub fn trust_anchor(&self) -> &TrustAnchor {
        &self.trust
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    pub(crate) fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(|e| {
            warn!("authority commit lock was poisoned, recovering");
            e.into_inner()
        })
    }

    // ---- Certificates ----

    /// Register a participant certificate.
    ///
    /// Replaces any certificate already registered for the same app. The
    /// authority's own certificates cannot be replaced.
    ///
    /// # Errors
    ///
    /// Returns a malformed-input error if the payload does not decode or
    /// targets an authority principal, and
    /// [`CapabilityError::UntrustedCertificate`] if it was not issued by the
    /// CA.
    pub fn register_certificate(&self, cert: AppCertificate) -> AuthorityResult<AppCertificate> {
        let cert = cert.decode()?;
        let decoded = cert
            .certificate()
            .ok_or_else(|| AuthorityError::malformed("certificate payload did not decode"))?;

        if let Err(e) = self.trust.verify(decoded) {
            warn!(app_id = %cert.app_id, error = %e, "certificate rejected");
            return Err(e.into());
        }

        if cert.app_id == self.cp.id() || cert.app_id == self.user.id() {
            warn!(app_id = %cert.app_id, "attempt to replace an authority certificate");
            return Err(AuthorityError::malformed(format!(
                "certificate for {} belongs to the authority and cannot be replaced",
                cert.app_id
            )));
        }

        let replaced = self.store.certificates().replace(cert.clone()).is_some();
        info!(
            app_id = %cert.app_id,
            subject = %decoded.subject(),
            replaced,
            "certificate registered"
        );
        Ok(cert)
    }

    /// The certificate of one of the authority's principals.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotFound`] if it is missing, which only
    /// happens if the store was cleared.
    pub fn fetch_authority_certificate(&self, role: AuthorityRole) -> AuthorityResult<AppCertificate> {
        let id = self.principal_id(role);
        self.store
            .certificate_for(id)
            .ok_or_else(|| AuthorityError::not_found("certificate", id))
    }

    fn signer_certificate(&self, signer_id: AppId) -> AuthorityResult<AppCertificate> {
        self.store.certificate_for(signer_id).ok_or_else(|| {
            AuthorityError::Capability(CapabilityError::UnknownSigner {
                signer_id: signer_id.to_string(),
            })
        })
    }

    // ---- Offers ----

    /// Accept one offered root capability.
    ///
    /// The offer must be well formed, self-authorizing, and signed by its
    /// assigner's registered key. Accepting an id already stored is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a malformed-input error, [`CapabilityError::UnknownSigner`] or
    /// [`CapabilityError::InvalidSignature`].
    pub fn submit_capability(&self, offer: Capability) -> AuthorityResult<Capability> {
        offer.check_offer()?;
        let cert = self.signer_certificate(offer.assigner_id)?;
        offer.verify(&cert.public_key()?)?;

        if self.store.offered().add(offer.clone()) {
            info!(
                capability_id = %offer.capability_id,
                app_id = %offer.app_id,
                name = %offer.capability_name,
                condition = %offer.grant_condition,
                hash = %offer.content_hash(),
                "capability offer accepted"
            );
        } else {
            debug!(capability_id = %offer.capability_id, "capability offer already recorded");
        }
        Ok(offer)
    }

    /// Accept a batch of offers, each on its own.
    ///
    /// Rejected offers are logged and skipped. Returns the accepted ones.
    #[must_use]
    pub fn submit_capabilities(&self, offers: Vec<Capability>) -> Vec<Capability> {
        let submitted = offers.len();
        let accepted: Vec<Capability> = offers
            .into_iter()
            .filter_map(|offer| {
                let id = offer.capability_id;
                match self.submit_capability(offer) {
                    Ok(offer) => Some(offer),
                    Err(e) => {
                        warn!(capability_id = %id, kind = %e.kind(), error = %e, "capability offer rejected");
                        None
                    },
                }
            })
            .collect();
        debug!(submitted, accepted = accepted.len(), "capability batch processed");
        accepted
    }

    // ---- Policies ----

    /// Record a user grant policy. Re-submitting a policy id is a no-op.
    #[must_use]
    pub fn submit_user_grant_policy(&self, policy: UserGrantPolicy) -> UserGrantPolicy {
        if self.store.policies().add(policy.clone()) {
            info!(
                policy_id = %policy.user_grant_policy_id,
                capability_id = %policy.capability_id,
                requester_id = %policy.requester_id,
                grant = policy.grant,
                "user grant policy recorded"
            );
        }
        policy
    }

    // ---- Read views ----

    /// Every offered capability, in submission order.
    #[must_use]
    pub fn list_capabilities(&self) -> Vec<Capability> {
        self.store.offered().all()
    }

    /// Offered capabilities that authorize themselves.
    #[must_use]
    pub fn list_root_capabilities(&self) -> Vec<Capability> {
        self.store.offered().matching(&CapabilityQuery::new().roots())
    }

    /// Every derived capability: grants and delegations.
    #[must_use]
    pub fn list_granted(&self) -> Vec<Capability> {
        self.store.granted().all()
    }

    /// Every recorded request with its accumulated grants.
    #[must_use]
    pub fn list_requests(&self) -> Vec<CapabilityRequest> {
        self.store.requests().all()
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authority")
            .field("cp_id", &self.cp.id())
            .field("user_id", &self.user.id())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AuthorityFixture, app_identity};
    use crebas_capabilities::{CapabilityName, GrantCondition};
    use crebas_test::{rogue_pki, test_app_key, test_cp_identity, test_pki, test_user_identity};

    #[test]
    fn test_new_registers_authority_certificates() {
        let fx = AuthorityFixture::new();
        let cp = fx.authority.fetch_authority_certificate(AuthorityRole::Cp).unwrap();
        let user = fx.authority.fetch_authority_certificate(AuthorityRole::User).unwrap();

        assert_eq!(cp.app_id, fx.authority.cp_id());
        assert_eq!(user.app_id, fx.authority.user_id());
        let anchor = test_pki().trust_anchor();
        assert!(anchor.verify(cp.certificate().unwrap()).is_ok());
        assert!(anchor.verify(user.certificate().unwrap()).is_ok());
    }

    #[test]
    fn test_new_rejects_mismatched_key() {
        let cp = test_cp_identity();
        let user = test_user_identity();
        // Operator certificate paired with the Control Provider's key.
        let result = Authority::new(
            test_pki().trust_anchor(),
            AuthorityIdentity::new(Principal::new(AppId::new(), cp.key.clone()), cp.certificate),
            AuthorityIdentity::new(Principal::new(AppId::new(), cp.key), user.certificate),
        );
        assert!(matches!(
            result,
            Err(AuthorityError::Identity {
                role: AuthorityRole::User,
                ..
            })
        ));
    }

    #[test]
    fn test_new_rejects_foreign_ca() {
        let cp = test_cp_identity();
        let user = test_user_identity();
        let result = Authority::new(
            rogue_pki().trust_anchor(),
            AuthorityIdentity::new(Principal::new(AppId::new(), cp.key), cp.certificate),
            AuthorityIdentity::new(Principal::new(AppId::new(), user.key), user.certificate),
        );
        assert!(matches!(
            result,
            Err(AuthorityError::Identity {
                role: AuthorityRole::Cp,
                ..
            })
        ));
    }

    #[test]
    fn test_register_certificate_replaces() {
        let fx = AuthorityFixture::new();
        let (app, cert) = app_identity(0);
        fx.authority.register_certificate(cert.clone()).unwrap();
        fx.authority.register_certificate(cert).unwrap();

        // Two authority certificates plus the app's.
        assert_eq!(fx.authority.store().certificates().count(), 3);
        assert!(fx.authority.store().certificate_for(app.id()).is_some());
    }

    #[test]
    fn test_register_certificate_rejects_foreign_ca() {
        let fx = AuthorityFixture::new();
        let key = test_app_key(1);
        let cert = AppCertificate::new(AppId::new(), &rogue_pki().issue("rogue", &key)).unwrap();

        let err = fx.authority.register_certificate(cert).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UntrustedCertificate);
    }

    #[test]
    fn test_register_certificate_rejects_garbage() {
        let fx = AuthorityFixture::new();
        let cert: AppCertificate = serde_json::from_value(serde_json::json!({
            "appID": AppId::new(),
            "certificate": "bm90IGEgY2VydGlmaWNhdGU=",
        }))
        .unwrap();

        let err = fx.authority.register_certificate(cert).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn test_register_certificate_protects_authority_ids() {
        let fx = AuthorityFixture::new();
        let key = test_app_key(2);
        let cert =
            AppCertificate::new(fx.authority.cp_id(), &test_pki().issue("imposter", &key)).unwrap();

        let err = fx.authority.register_certificate(cert).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn test_submit_capability_is_idempotent() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let offer = fx.offer(&app, CapabilityName::Temperature, "room", GrantCondition::Always);

        fx.authority.submit_capability(offer.clone()).unwrap();
        fx.authority.submit_capability(offer).unwrap();
        assert_eq!(fx.authority.list_capabilities().len(), 1);
    }

    #[test]
    fn test_submit_capability_unknown_signer() {
        let fx = AuthorityFixture::new();
        let (app, _) = app_identity(0);
        let offer = fx.offer(&app, CapabilityName::Humidity, "room", GrantCondition::Always);

        let err = fx.authority.submit_capability(offer).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnknownSigner);
    }

    #[test]
    fn test_submit_capability_tampered() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let mut offer = fx.offer(&app, CapabilityName::Humidity, "room", GrantCondition::Always);
        offer.capability_value = "everywhere".into();

        let err = fx.authority.submit_capability(offer).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidSignature);
        assert!(fx.authority.list_capabilities().is_empty());
    }

    #[test]
    fn test_submit_capability_rejects_non_root() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let mut offer = Capability::root(app.id(), CapabilityName::Temperature, "room")
            .with_condition(GrantCondition::Always);
        offer.authorize_capability_id = crebas_capabilities::CapabilityId::new();
        offer.sign(&app).unwrap();

        let err = fx.authority.submit_capability(offer).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn test_submit_capabilities_filters_per_offer() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let good = fx.offer(&app, CapabilityName::Temperature, "a", GrantCondition::Always);
        let mut bad = fx.offer(&app, CapabilityName::Temperature, "b", GrantCondition::Always);
        bad.capability_value = "c".into();

        let accepted = fx.authority.submit_capabilities(vec![good.clone(), bad]);
        assert_eq!(accepted, vec![good]);
        assert_eq!(fx.authority.list_root_capabilities().len(), 1);
    }

    #[test]
    fn test_submit_policy_is_idempotent() {
        let fx = AuthorityFixture::new();
        let policy = UserGrantPolicy::allow(crebas_capabilities::CapabilityId::new(), AppId::new());
        let _ = fx.authority.submit_user_grant_policy(policy.clone());
        let _ = fx.authority.submit_user_grant_policy(policy);
        assert_eq!(fx.authority.store().policies().count(), 1);
    }

    #[test]
    fn test_authority_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Authority>();
    }
}
