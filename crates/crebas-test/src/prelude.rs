//! Prelude module - commonly used test helpers.
//!
//! Use `use crebas_test::prelude::*;` in test modules.

pub use crate::{
    PkiFiles, TestIdentity, TestPki, init_test_logging, rogue_pki, test_app_key, test_cp_identity,
    test_cp_key, test_identity, test_pki, test_user_identity, test_user_key, write_pki_files,
};
