//! Request evaluation, pending views and manual grants.

use crebas_capabilities::{
    CapReqPendingResponse, CapReqResponse, Capability, CapabilityError, CapabilityId,
    CapabilityQuery, CapabilityRequest, GrantEvaluator, RequestId, delegate, grant_from,
};
use tracing::{debug, info, warn};

use crate::authority::Authority;
use crate::error::{AuthorityError, AuthorityResult};

impl Authority {
    /// Evaluate a signed capability request and record what it is granted.
    ///
    /// A request id seen before keeps its earlier grants; only grants it
    /// does not yet hold are added. The response carries every grant the
    /// request has accumulated.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownSigner`] if the requester has no
    /// certificate, [`CapabilityError::InvalidSignature`] if the signature
    /// does not verify, or [`CapabilityError::AmbiguousPolicy`] if overrides
    /// conflict. Nothing is stored on error.
    pub fn submit_request(&self, request: CapabilityRequest) -> AuthorityResult<CapReqResponse> {
        let cert = self.store.certificate_for(request.requester_id).ok_or_else(|| {
            AuthorityError::Capability(CapabilityError::UnknownSigner {
                signer_id: request.requester_id.to_string(),
            })
        })?;
        request.verify(&cert.public_key()?)?;

        let _commit = self.lock_commit();

        let request_id = request.request_id;
        let current = self.store.requests().get_by_id(request_id).unwrap_or(request);

        let offered = self
            .store
            .offered()
            .matching(&CapabilityQuery::candidates_for(&current));
        let policies = self.store.policies().all();
        let grants = GrantEvaluator::new(&self.cp).evaluate(&current, &offered, &policies)?;

        if self.store.requests().add(current) {
            debug!(%request_id, "capability request recorded");
        }

        for grant in grants {
            self.commit_grant(request_id, grant);
        }

        let stored = self
            .store
            .requests()
            .get_by_id(request_id)
            .ok_or_else(|| AuthorityError::not_found("request", request_id))?;

        info!(
            %request_id,
            requester_id = %stored.requester_id,
            name = %stored.request_capability_name,
            granted = stored.granted_capabilities().len(),
            "capability request evaluated"
        );
        Ok(CapReqResponse::accumulated(stored))
    }

    /// Insert `grant` into the global granted set, then into the request's
    /// own set.
    ///
    /// A scope already present in the global set is not granted again, and
    /// the request does not record it either: every grant a request holds
    /// is listed globally. Returns whether the request recorded the grant.
    ///
    /// Caller holds the commit lock.
    fn commit_grant(&self, request_id: RequestId, grant: Capability) -> bool {
        let scope = CapabilityQuery::new().same_scope(&grant);
        if !self.store.granted().insert_unless(grant.clone(), &scope) {
            debug!(
                %request_id,
                authorizer = %grant.authorize_capability_id,
                value = %grant.capability_value,
                "scope already granted globally"
            );
            return false;
        }
        info!(
            capability_id = %grant.capability_id,
            authorizer = %grant.authorize_capability_id,
            assignee_id = %grant.assignee_id,
            value = %grant.capability_value,
            "capability granted"
        );

        let recorded = self
            .store
            .requests()
            .update(request_id, |req| req.record_grant(grant))
            .unwrap_or(false);
        if !recorded {
            debug!(%request_id, "request already holds this scope");
        }
        recorded
    }

    /// Requests together with the root capabilities still awaiting a
    /// decision for them.
    ///
    /// A root is pending for a request when it carries the requested name
    /// and nothing about its app has been granted yet. Every request is
    /// listed, including those with nothing pending.
    #[must_use]
    pub fn list_pending(&self) -> Vec<CapReqPendingResponse> {
        let granted = self.store.granted().all();
        self.store
            .requests()
            .all()
            .into_iter()
            .map(|request| {
                let pending_capabilities = self
                    .store
                    .offered()
                    .matching(&CapabilityQuery::candidates_for(&request))
                    .into_iter()
                    .filter(|root| !granted.iter().any(|g| g.app_id == root.app_id))
                    .collect();
                CapReqPendingResponse {
                    request,
                    pending_capabilities,
                }
            })
            .collect()
    }

    /// Grant `capability_id` to the requester of `request_id` on the human
    /// operator's authority.
    ///
    /// The root is first delegated from the Control Provider to the
    /// operator (reusing an earlier delegation of the same root), then
    /// granted to the requester under the operator's signature. No domain
    /// check applies. If the request already holds a grant of the same scope
    /// that grant is returned instead of a new one. If another request
    /// already holds the scope globally nothing is granted and the response
    /// carries no grants.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotFound`] if either id is unknown and
    /// [`CapabilityError::Malformed`] if the root's name differs from the
    /// requested one.
    pub fn grant_manually(
        &self,
        request_id: RequestId,
        capability_id: CapabilityId,
    ) -> AuthorityResult<CapReqResponse> {
        let _commit = self.lock_commit();

        let request = self
            .store
            .requests()
            .get_by_id(request_id)
            .ok_or_else(|| AuthorityError::not_found("request", request_id))?;
        let root = self
            .store
            .offered()
            .get_by_id(capability_id)
            .ok_or_else(|| AuthorityError::not_found("capability", capability_id))?;
        if root.capability_name != request.request_capability_name {
            return Err(AuthorityError::malformed(format!(
                "capability {capability_id} grants {} but request {request_id} asks for {}",
                root.capability_name, request.request_capability_name
            )));
        }

        let (delegation, fresh_delegation) = self.delegation_to_user(&root)?;
        let grant = grant_from(&delegation, &self.user, &request)?;

        if let Some(held) = request
            .granted_capabilities()
            .iter()
            .find(|held| held.same_scope(&grant))
        {
            debug!(%request_id, capability_id = %held.capability_id, "manual grant already held");
            return Ok(CapReqResponse {
                granted_capabilities: vec![held.clone()],
                request,
            });
        }

        if fresh_delegation {
            self.store.granted().add(delegation.clone());
            debug!(
                root = %root.capability_id,
                capability_id = %delegation.capability_id,
                "capability delegated to operator"
            );
        }

        if !self.commit_grant(request_id, grant.clone()) {
            warn!(
                %request_id,
                root = %root.capability_id,
                value = %grant.capability_value,
                "manual grant skipped, scope already held by another request"
            );
            return Ok(CapReqResponse {
                request,
                granted_capabilities: Vec::new(),
            });
        }
        let request = self
            .store
            .requests()
            .get_by_id(request_id)
            .ok_or_else(|| AuthorityError::not_found("request", request_id))?;

        info!(
            %request_id,
            root = %root.capability_id,
            capability_id = %grant.capability_id,
            operator = %self.user.id(),
            "capability granted manually"
        );
        Ok(CapReqResponse {
            request,
            granted_capabilities: vec![grant],
        })
    }

    /// The delegation of `root` from the Control Provider to the operator,
    /// and whether it still has to be recorded.
    fn delegation_to_user(&self, root: &Capability) -> AuthorityResult<(Capability, bool)> {
        let query = CapabilityQuery::new()
            .authorized_by(root.capability_id)
            .assigner(self.cp.id())
            .assignee(self.user.id());
        if let Some(existing) = self.store.granted().first_matching(&query) {
            return Ok((existing, false));
        }
        Ok((delegate(root, &self.cp, self.user.id())?, true))
    }
}

#[cfg(test)]
mod tests {
    use crebas_capabilities::{
        AppId, CapabilityAttributeBasedPolicy, CapabilityName, GrantCondition, UserGrantPolicy,
        VendorId,
    };
    use crebas_test::test_user_identity;

    use super::*;
    use crate::ErrorKind;
    use crate::testing::AuthorityFixture;

    #[test]
    fn test_always_grant_external_communication() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let root = fx.submit_offer(
            &app,
            CapabilityName::ExternalCommunication,
            "*.hoge.example.com",
            GrantCondition::Always,
        );

        let request = fx.request(
            &requester,
            CapabilityName::ExternalCommunication,
            "*.test.hoge.example.com",
        );
        let response = fx.authority.submit_request(request).unwrap();

        assert_eq!(response.granted_capabilities.len(), 1);
        let grant = &response.granted_capabilities[0];
        assert_eq!(grant.capability_value, "*.test.hoge.example.com");
        assert_eq!(grant.authorize_capability_id, root.capability_id);
        assert_eq!(grant.assigner_id, fx.authority.cp_id());
        assert_eq!(grant.assignee_id, requester.id());
        assert!(!grant.is_root());
        assert!(grant.verify(fx.authority.cp.public_key()).is_ok());
        assert_eq!(fx.authority.list_granted().len(), 1);
    }

    #[test]
    fn test_domain_outside_scope_not_granted() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        fx.submit_offer(
            &app,
            CapabilityName::ExternalCommunication,
            "*.hoge.example.com",
            GrantCondition::Always,
        );

        let request = fx.request(&requester, CapabilityName::ExternalCommunication, "evil.example.com");
        let response = fx.authority.submit_request(request).unwrap();
        assert!(response.granted_capabilities.is_empty());
    }

    #[test]
    fn test_resubmission_accumulates_without_duplicates() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        fx.submit_offer(&app, CapabilityName::Temperature, "room-1", GrantCondition::Always);

        let request = fx.request(&requester, CapabilityName::Temperature, "");
        let first = fx.authority.submit_request(request.clone()).unwrap();
        assert_eq!(first.granted_capabilities.len(), 1);

        // A second offer appears; resubmitting picks it up and keeps the first.
        let other = fx.register_app(2);
        fx.submit_offer(&other, CapabilityName::Temperature, "room-2", GrantCondition::Always);
        let second = fx.authority.submit_request(request).unwrap();

        assert_eq!(second.granted_capabilities.len(), 2);
        assert_eq!(
            second.granted_capabilities[0].capability_id,
            first.granted_capabilities[0].capability_id
        );
        assert_eq!(fx.authority.list_requests().len(), 1);
        assert_eq!(fx.authority.list_granted().len(), 2);
    }

    #[test]
    fn test_conditional_by_vendor() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let vendor = VendorId::new();
        let mut offer = Capability::root(app.id(), CapabilityName::Humidity, "greenhouse")
            .with_policy(CapabilityAttributeBasedPolicy::vendor(vendor));
        offer.sign(&app).unwrap();
        fx.authority.submit_capability(offer).unwrap();

        let mut matching =
            CapabilityRequest::new(requester.id(), fx.authority.cp_id(), "Humidity", "")
                .with_vendor(vendor);
        matching.sign(&requester).unwrap();
        let mut other = CapabilityRequest::new(requester.id(), fx.authority.cp_id(), "Humidity", "")
            .with_vendor(VendorId::new());
        other.sign(&requester).unwrap();

        assert_eq!(
            fx.authority.submit_request(matching).unwrap().granted_capabilities.len(),
            1
        );
        assert!(
            fx.authority
                .submit_request(other)
                .unwrap()
                .granted_capabilities
                .is_empty()
        );
    }

    #[test]
    fn test_override_precedence() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let never = fx.submit_offer(&app, CapabilityName::Temperature, "a", GrantCondition::None);
        let always = fx.submit_offer(&app, CapabilityName::Temperature, "b", GrantCondition::Always);

        let _ = fx
            .authority
            .submit_user_grant_policy(UserGrantPolicy::allow(never.capability_id, requester.id()));
        let _ = fx
            .authority
            .submit_user_grant_policy(UserGrantPolicy::deny(always.capability_id, requester.id()));

        let request = fx.request(&requester, CapabilityName::Temperature, "");
        let response = fx.authority.submit_request(request).unwrap();

        assert_eq!(response.granted_capabilities.len(), 1);
        assert_eq!(
            response.granted_capabilities[0].authorize_capability_id,
            never.capability_id
        );
    }

    #[test]
    fn test_ambiguous_policy_stores_nothing() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let root = fx.submit_offer(&app, CapabilityName::Temperature, "a", GrantCondition::Always);
        let _ = fx
            .authority
            .submit_user_grant_policy(UserGrantPolicy::allow(root.capability_id, requester.id()));
        let _ = fx
            .authority
            .submit_user_grant_policy(UserGrantPolicy::deny(root.capability_id, requester.id()));

        let request = fx.request(&requester, CapabilityName::Temperature, "");
        let err = fx.authority.submit_request(request).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AmbiguousPolicy);
        assert!(fx.authority.list_requests().is_empty());
        assert!(fx.authority.list_granted().is_empty());
    }

    #[test]
    fn test_request_signature_checks() {
        let fx = AuthorityFixture::new();
        let requester = fx.register_app(1);

        let mut tampered = fx.request(&requester, CapabilityName::Temperature, "a");
        tampered.request_capability_value = "b".into();
        assert_eq!(
            fx.authority.submit_request(tampered).unwrap_err().kind(),
            ErrorKind::InvalidSignature
        );

        let mut unknown = CapabilityRequest::new(AppId::new(), fx.authority.cp_id(), "Temperature", "");
        unknown.sign(&requester).unwrap();
        assert_eq!(
            fx.authority.submit_request(unknown).unwrap_err().kind(),
            ErrorKind::UnknownSigner
        );
    }

    #[test]
    fn test_same_scope_for_two_requesters_is_one_global_entry() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let first = fx.register_app(1);
        let second = fx.register_app(2);
        fx.submit_offer(&app, CapabilityName::Temperature, "room", GrantCondition::Always);

        let a = fx
            .authority
            .submit_request(fx.request(&first, CapabilityName::Temperature, ""))
            .unwrap();
        let b = fx
            .authority
            .submit_request(fx.request(&second, CapabilityName::Temperature, ""))
            .unwrap();

        assert_eq!(a.granted_capabilities.len(), 1);
        assert!(b.granted_capabilities.is_empty());

        // Every grant a request holds is listed globally.
        let granted = fx.authority.list_granted();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].assignee_id, first.id());
        for request in fx.authority.list_requests() {
            for held in request.granted_capabilities() {
                assert!(granted.contains(held));
            }
        }
    }

    #[test]
    fn test_domain_spellings_share_one_grant() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        fx.submit_offer(
            &app,
            CapabilityName::ExternalCommunication,
            "*.hoge.example.com",
            GrantCondition::Always,
        );

        let lower = fx
            .authority
            .submit_request(fx.request(
                &requester,
                CapabilityName::ExternalCommunication,
                "api.hoge.example.com",
            ))
            .unwrap();
        let upper = fx
            .authority
            .submit_request(fx.request(
                &requester,
                CapabilityName::ExternalCommunication,
                "API.hoge.example.com.",
            ))
            .unwrap();

        assert_eq!(lower.granted_capabilities[0].capability_value, "api.hoge.example.com");
        assert!(upper.granted_capabilities.is_empty());
        assert_eq!(fx.authority.list_granted().len(), 1);
    }

    #[test]
    fn test_manual_grant_name_mismatch_writes_nothing() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let root = fx.submit_offer(&app, CapabilityName::Temperature, "room", GrantCondition::None);
        let request = fx.request(&requester, CapabilityName::Humidity, "");
        let request_id = request.request_id;
        fx.authority.submit_request(request).unwrap();

        let err = fx
            .authority
            .grant_manually(request_id, root.capability_id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(fx.authority.list_granted().is_empty());
        assert!(fx.authority.list_requests()[0].granted_capabilities().is_empty());
    }

    #[test]
    fn test_manual_grant_of_scope_held_elsewhere() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let first = fx.register_app(1);
        let second = fx.register_app(2);
        let root = fx.submit_offer(&app, CapabilityName::Temperature, "room", GrantCondition::None);

        let mut ids = Vec::new();
        for requester in [&first, &second] {
            let request = fx.request(requester, CapabilityName::Temperature, "");
            ids.push(request.request_id);
            fx.authority.submit_request(request).unwrap();
        }

        let granted = fx.authority.grant_manually(ids[0], root.capability_id).unwrap();
        assert_eq!(granted.granted_capabilities.len(), 1);

        let skipped = fx.authority.grant_manually(ids[1], root.capability_id).unwrap();
        assert!(skipped.granted_capabilities.is_empty());
        assert!(skipped.request.granted_capabilities().is_empty());

        // One delegation, one grant.
        assert_eq!(fx.authority.list_granted().len(), 2);
    }

    #[test]
    fn test_pending_and_manual_grant() {
        let fx = AuthorityFixture::new();
        let app = fx.register_app(0);
        let requester = fx.register_app(1);
        let root = fx.submit_offer(&app, CapabilityName::NeighborDiscovery, "lan", GrantCondition::None);

        let request = fx.request(&requester, CapabilityName::NeighborDiscovery, "");
        let request_id = request.request_id;
        assert!(
            fx.authority
                .submit_request(request.clone())
                .unwrap()
                .granted_capabilities
                .is_empty()
        );

        let pending = fx.authority.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].pending_capabilities, vec![root.clone()]);

        let response = fx.authority.grant_manually(request_id, root.capability_id).unwrap();
        assert_eq!(response.granted_capabilities.len(), 1);
        let grant = &response.granted_capabilities[0];
        assert_eq!(grant.assigner_id, fx.authority.user_id());
        assert_eq!(grant.assignee_id, requester.id());
        let operator_key = test_user_identity().certificate.public_key().unwrap();
        assert!(grant.verify(&operator_key).is_ok());

        // The delegation points at the root, the grant at the delegation.
        let delegation = fx
            .authority
            .store()
            .granted()
            .get_by_id(grant.authorize_capability_id)
            .unwrap();
        assert_eq!(delegation.authorize_capability_id, root.capability_id);
        assert_eq!(delegation.assigner_id, fx.authority.cp_id());
        assert_eq!(delegation.assignee_id, fx.authority.user_id());

        let pending = fx.authority.list_pending();
        assert!(pending[0].pending_capabilities.is_empty());

        // Granting again returns the held grant; resubmitting keeps one copy.
        let again = fx.authority.grant_manually(request_id, root.capability_id).unwrap();
        assert_eq!(again.granted_capabilities[0].capability_id, grant.capability_id);
        let resubmitted = fx.authority.submit_request(request).unwrap();
        assert_eq!(resubmitted.granted_capabilities.len(), 1);
        assert_eq!(fx.authority.list_granted().len(), 2);
    }

    #[test]
    fn test_manual_grant_unknown_ids() {
        let fx = AuthorityFixture::new();
        let err = fx
            .authority
            .grant_manually(RequestId::new(), CapabilityId::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
