//! Subcommand implementations.

pub(crate) mod cert;
pub(crate) mod check;
pub(crate) mod config;
pub(crate) mod replay;
