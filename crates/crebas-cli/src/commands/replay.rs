//! `replay` command: run a JSON operation script against a fresh
//! in-memory authority.

use std::path::Path;

use anyhow::{Context, Result, bail};
use crebas_authority::{Authority, Operation, Reply};
use tracing::info;

/// Dispatch every operation in `input`, in order.
///
/// # Errors
///
/// Returns an error if `input` does not parse as operations. Failed
/// operations are reported in their [`Reply`], not as errors.
pub(crate) fn replay(authority: &Authority, input: &str) -> Result<Vec<Reply>> {
    let ops = Operation::parse_batch(input)?;
    info!(operations = ops.len(), "replaying operations");
    Ok(ops.into_iter().map(|op| authority.dispatch(op)).collect())
}

/// Replay the script at `path` and print the replies as a JSON array.
///
/// With `strict`, any error reply fails the command.
pub(crate) fn run_replay(authority: &Authority, path: &Path, strict: bool) -> Result<()> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let replies = replay(authority, &input)?;
    println!("{}", serde_json::to_string_pretty(&replies)?);

    let failed = replies.iter().filter(|reply| reply.is_error()).count();
    if strict && failed > 0 {
        bail!("{failed} of {} operations failed", replies.len());
    }
    Ok(())
}
