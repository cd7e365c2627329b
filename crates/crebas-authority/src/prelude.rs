//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crebas_authority::prelude::*;` to import all essential types.

pub use crate::{
    Authority, AuthorityError, AuthorityIdentity, AuthorityResult, AuthorityRole, ErrorKind,
    Operation, Reply,
};
