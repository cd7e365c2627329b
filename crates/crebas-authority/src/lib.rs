//! CREBAS Authority - the capability authority protocol handler.
//!
//! An [`Authority`] owns the capability store, the CA trust anchor and two
//! signing principals: the Control Provider, which signs automatic grants,
//! and the human operator, which signs manual grants. It exposes every
//! inbound operation as a method, and [`Authority::dispatch`] routes the
//! JSON [`Operation`] envelope onto them.
//!
//! # Concurrency
//!
//! `Authority` is `Send + Sync`. Each store collection has its own lock;
//! request evaluation and manual grants additionally run under one
//! authority-wide commit lock, so two identical requests racing each other
//! cannot both be granted the same scope.
//!
//! # Example
//!
//! ```no_run
//! use crebas_authority::prelude::*;
//! use crebas_capabilities::{AppId, Principal};
//! use crebas_crypto::{Certificate, KeyPair, TrustAnchor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let trust = TrustAnchor::load("/etc/crebas/pki/ca/ca.crt")?;
//! let cp = AuthorityIdentity::new(
//!     Principal::new(AppId::new(), KeyPair::load("/etc/crebas/pki/cp/cp.key")?),
//!     Certificate::load("/etc/crebas/pki/cp/cp.crt")?,
//! );
//! let user = AuthorityIdentity::new(
//!     Principal::new(AppId::new(), KeyPair::load("/etc/crebas/pki/user/user.key")?),
//!     Certificate::load("/etc/crebas/pki/user/user.crt")?,
//! );
//!
//! let authority = Authority::new(trust, cp, user)?;
//! let reply = authority.dispatch(Operation::ListPendingRequests);
//! println!("{}", serde_json::to_string_pretty(&reply)?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod authority;
mod error;
mod grants;
mod protocol;
mod role;

#[cfg(test)]
mod testing;

pub use authority::Authority;
pub use error::{AuthorityError, AuthorityResult, ErrorKind};
pub use protocol::{Operation, Reply};
pub use role::{AuthorityIdentity, AuthorityRole};
