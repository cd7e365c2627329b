//! Typed identifiers.
//!
//! All identifiers are UUIDs on the wire. Keeping them as distinct types
//! stops a request id from being looked up in the capability collection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Raw UUID bytes (used in signing data).
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Accepts both the bare UUID and the prefixed display form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Uuid::parse_str(raw).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Identifier of a participant: an app, a device, the Control Provider,
    /// or the human operator.
    AppId,
    "app"
);

define_id!(
    /// Identifier of a capability.
    CapabilityId,
    "cap"
);

define_id!(
    /// Identifier of a capability request.
    RequestId,
    "req"
);

define_id!(
    /// Identifier of a user grant policy.
    UserGrantPolicyId,
    "policy"
);

define_id!(
    /// Identifier of a device vendor.
    VendorId,
    "vendor"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(CapabilityId::new(), CapabilityId::new());
    }

    #[test]
    fn test_display_and_parse() {
        let id = RequestId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("req:"));
        assert_eq!(shown.parse::<RequestId>().unwrap(), id);
        assert_eq!(id.0.to_string().parse::<RequestId>().unwrap(), id);
    }

    #[test]
    fn test_serde_is_bare_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&AppId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
