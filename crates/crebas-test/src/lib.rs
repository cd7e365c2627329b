//! CREBAS Test - Shared test utilities for the capability authority.
//!
//! Generating RSA keys and certificates is slow, so everything here is
//! created once per test binary and handed out as clones.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! crebas-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use crebas_test::{test_pki, test_app_key};
//!
//! let key = test_app_key(0);
//! let cert = test_pki().issue("app-0", &key);
//! assert!(test_pki().trust_anchor().verify(&cert).is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod files;
pub mod fixtures;
pub mod pki;

pub use files::*;
pub use fixtures::*;
pub use pki::*;
