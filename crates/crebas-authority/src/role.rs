//! The authority's two signing roles.

use std::fmt;
use std::str::FromStr;

use crebas_capabilities::Principal;
use crebas_crypto::Certificate;
use serde::{Deserialize, Serialize};

/// Which of the authority's principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityRole {
    /// The Control Provider, which signs automatic grants and delegations.
    Cp,
    /// The human operator, which signs manual grants.
    User,
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cp => f.write_str("cp"),
            Self::User => f.write_str("user"),
        }
    }
}

impl FromStr for AuthorityRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cp" => Ok(Self::Cp),
            "user" => Ok(Self::User),
            other => Err(format!("unknown authority role '{other}' (expected cp or user)")),
        }
    }
}

/// A principal together with the CA-issued certificate for its key.
#[derive(Debug, Clone)]
pub struct AuthorityIdentity {
    /// Signing principal.
    pub principal: Principal,
    /// Certificate binding the principal's key to the CA.
    pub certificate: Certificate,
}

impl AuthorityIdentity {
    /// Pair a principal with its certificate.
    #[must_use]
    pub fn new(principal: Principal, certificate: Certificate) -> Self {
        Self {
            principal,
            certificate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("cp".parse::<AuthorityRole>().unwrap(), AuthorityRole::Cp);
        assert_eq!("USER".parse::<AuthorityRole>().unwrap(), AuthorityRole::User);
        assert!("admin".parse::<AuthorityRole>().is_err());
        assert_eq!(AuthorityRole::Cp.to_string(), "cp");
        assert_eq!(serde_json::to_string(&AuthorityRole::User).unwrap(), "\"user\"");
    }
}
