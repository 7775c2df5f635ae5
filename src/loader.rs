//! Loading of the proxies and tokens files

use std::path::Path;

use tracing::debug;

use crate::error::{KeepAliveError, Result};

/// Read proxy lines, trimmed, skipping blank lines and `#` comments
///
/// Lines are returned unparsed; the driver decides which are usable.
pub async fn load_proxies(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let lines = read_lines(path.as_ref(), true).await?;
    debug!("Loaded {} proxy lines from {}", lines.len(), path.as_ref().display());
    Ok(lines)
}

/// Read bearer tokens, one per non-empty trimmed line
pub async fn load_tokens(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let lines = read_lines(path.as_ref(), false).await?;
    debug!("Loaded {} tokens from {}", lines.len(), path.as_ref().display());
    Ok(lines)
}

async fn read_lines(path: &Path, skip_comments: bool) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| KeepAliveError::FileLoad {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !(skip_comments && line.starts_with('#')))
        .map(str::to_string)
        .collect())
}
