//! Certificate trust and signature checks at the authority boundary.

mod common;

use common::Harness;
use crebas_authority::{AuthorityRole, ErrorKind};
use crebas_capabilities::{AppCertificate, AppId, CapabilityName, GrantCondition, Principal};
use crebas_test::{rogue_pki, test_app_key, test_pki};

#[test]
fn test_authority_certificates_chain_to_ca() {
    let h = Harness::new();
    let trust = h.authority.trust_anchor();

    for role in [AuthorityRole::Cp, AuthorityRole::User] {
        let cert = h.authority.fetch_authority_certificate(role).unwrap();
        assert_eq!(cert.app_id, h.authority.principal_id(role));
        assert!(trust.verify(cert.certificate().unwrap()).is_ok());
    }
}

#[test]
fn test_registration_rejects_foreign_certificate() {
    let h = Harness::new();
    let principal = Principal::new(AppId::new(), test_app_key(0));
    let foreign = rogue_pki().issue("intruder", principal.key());
    let cert = AppCertificate::new(principal.id(), &foreign).unwrap();

    let err = h.authority.register_certificate(cert).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UntrustedCertificate);

    // Without a registered certificate its offers are refused.
    let offer = h.offer(&principal, CapabilityName::Temperature, "", GrantCondition::Always);
    let err = h.authority.submit_capability(offer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSigner);
}

#[test]
fn test_registration_cannot_replace_authority_identity() {
    let h = Harness::new();
    let impostor = test_pki().issue("impostor", &test_app_key(2));
    let cert = AppCertificate::new(h.authority.cp_id(), &impostor).unwrap();

    let err = h.authority.register_certificate(cert).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(
        h.authority
            .fetch_authority_certificate(AuthorityRole::Cp)
            .unwrap()
            .certificate()
            .unwrap()
            .subject()
            .contains("crebas-cp")
    );
}

#[test]
fn test_tampered_offer_rejected() {
    let h = Harness::new();
    let app = h.app(0);
    let mut offer = h.offer(&app, CapabilityName::ExternalCommunication, "*.hoge.example.com", GrantCondition::Always);
    offer.capability_value = "*.example.com".to_owned();

    let err = h.authority.submit_capability(offer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    assert!(h.authority.list_capabilities().is_empty());
}

#[test]
fn test_offer_signed_by_another_app_rejected() {
    let h = Harness::new();
    let app = h.app(0);
    let other = h.app(1);
    let mut offer = h.offer(&app, CapabilityName::Temperature, "", GrantCondition::Always);
    offer.sign(&other).unwrap();

    assert!(h.authority.submit_capability(offer).is_err());
}

#[test]
fn test_tampered_request_rejected() {
    let h = Harness::new();
    let app = h.app(0);
    let requester = h.app(1);
    h.publish(&app, CapabilityName::ExternalCommunication, "*.hoge.example.com", GrantCondition::Always);

    let mut request = h.request(&requester, CapabilityName::ExternalCommunication, "api.hoge.example.com");
    request.request_capability_value = "*.hoge.example.com".to_owned();

    let err = h.authority.submit_request(request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    assert!(h.authority.list_requests().is_empty());
    assert!(h.authority.list_granted().is_empty());
}

#[test]
fn test_request_from_unknown_signer_rejected() {
    let h = Harness::new();
    let app = h.app(0);
    h.publish(&app, CapabilityName::Temperature, "", GrantCondition::Always);
    let stranger = Principal::new(AppId::new(), test_app_key(3));

    let err = h
        .authority
        .submit_request(h.request(&stranger, CapabilityName::Temperature, ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSigner);
}

#[test]
fn test_batch_submission_keeps_valid_offers() {
    let h = Harness::new();
    let app = h.app(0);
    let good = h.offer(&app, CapabilityName::Temperature, "kitchen", GrantCondition::Always);
    let mut bad = h.offer(&app, CapabilityName::Humidity, "kitchen", GrantCondition::Always);
    bad.capability_value = "everywhere".to_owned();

    let accepted = h.authority.submit_capabilities(vec![good.clone(), bad]);
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].capability_id, good.capability_id);
}
