//! A throwaway certificate authority for tests.

use std::sync::LazyLock;

use crebas_crypto::{Certificate, KeyPair, TrustAnchor};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, PKCS_RSA_SHA256,
};

static PKI: LazyLock<TestPki> = LazyLock::new(|| TestPki::generate("CREBAS Test CA"));
static ROGUE_PKI: LazyLock<TestPki> = LazyLock::new(|| TestPki::generate("Rogue CA"));

/// The shared test CA.
#[must_use]
pub fn test_pki() -> &'static TestPki {
    &PKI
}

/// A second, unrelated CA whose certificates the shared CA does not trust.
#[must_use]
pub fn rogue_pki() -> &'static TestPki {
    &ROGUE_PKI
}

/// A self-signed RSA certificate authority able to issue leaf certificates.
pub struct TestPki {
    key: KeyPair,
    signer: rcgen::KeyPair,
    cert: rcgen::Certificate,
    certificate: Certificate,
}

impl TestPki {
    /// Generate a fresh CA with the given common name.
    ///
    /// # Panics
    ///
    /// Panics if key or certificate generation fails.
    #[must_use]
    pub fn generate(common_name: &str) -> Self {
        let key = KeyPair::generate().expect("CA key generation");
        let signer = to_rcgen(&key);

        let mut params = params_for(common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let cert = params.self_signed(&signer).expect("self-signed CA");
        let certificate = Certificate::from_der(cert.der().as_ref()).expect("decode CA");

        Self {
            key,
            signer,
            cert,
            certificate,
        }
    }

    /// The CA certificate.
    #[must_use]
    pub fn ca_certificate(&self) -> Certificate {
        self.certificate.clone()
    }

    /// The CA private key.
    #[must_use]
    pub fn ca_key(&self) -> KeyPair {
        self.key.clone()
    }

    /// A trust anchor rooted at this CA.
    #[must_use]
    pub fn trust_anchor(&self) -> TrustAnchor {
        TrustAnchor::new(self.ca_certificate())
    }

    /// Issue a leaf certificate for `key`.
    ///
    /// # Panics
    ///
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn issue(&self, common_name: &str, key: &KeyPair) -> Certificate {
        self.issue_with(params_for(common_name), key)
    }

    /// Issue a leaf certificate whose validity window ended in 2001.
    ///
    /// # Panics
    ///
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn issue_expired(&self, common_name: &str, key: &KeyPair) -> Certificate {
        let mut params = params_for(common_name);
        params.not_before = rcgen::date_time_ymd(2000, 1, 1);
        params.not_after = rcgen::date_time_ymd(2001, 1, 1);
        self.issue_with(params, key)
    }

    fn issue_with(&self, params: CertificateParams, key: &KeyPair) -> Certificate {
        let subject = to_rcgen(key);
        let cert = params
            .signed_by(&subject, &self.cert, &self.signer)
            .expect("issue leaf certificate");
        Certificate::from_der(cert.der().as_ref()).expect("decode leaf certificate")
    }
}

fn params_for(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("certificate params");
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, "CREBAS");
    params.distinguished_name = dn;
    params
}

fn to_rcgen(key: &KeyPair) -> rcgen::KeyPair {
    let pem = key.to_pkcs8_pem().expect("encode test key");
    rcgen::KeyPair::from_pkcs8_pem_and_sign_algo(&pem, &PKCS_RSA_SHA256).expect("rcgen key")
}
