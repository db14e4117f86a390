//! Content validation.
//!
//! The site skips content files it cannot parse; this command reports them
//! so a broken page is caught before deploy.

use std::path::Path;

use celesta_storefront::content::{ContentError, EventMeta, WorkshopMeta, parse_entry};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors from `content check`.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A content directory could not be listed.
    #[error("Cannot read {0}: {1}")]
    Io(String, std::io::Error),

    /// One or more files failed to parse.
    #[error("{0} content file(s) failed to parse")]
    Failed(usize),
}

/// Parse every event and workshop file under `dir`.
///
/// # Errors
///
/// Returns `CheckError::Failed` with the number of bad files.
pub fn check(dir: &Path) -> Result<(), CheckError> {
    let events = check_dir::<EventMeta>(&dir.join("events"))?;
    let workshops = check_dir::<WorkshopMeta>(&dir.join("workshops"))?;

    let failed = events.failed + workshops.failed;
    tracing::info!(
        events = events.ok,
        workshops = workshops.ok,
        failed,
        "Content checked"
    );

    if failed > 0 {
        return Err(CheckError::Failed(failed));
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    ok: usize,
    failed: usize,
}

fn check_dir<M: DeserializeOwned>(dir: &Path) -> Result<Tally, CheckError> {
    let mut tally = Tally::default();
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "Directory missing");
        return Ok(tally);
    }

    let listing = std::fs::read_dir(dir).map_err(|e| CheckError::Io(dir.display().to_string(), e))?;
    for item in listing.flatten() {
        let path = item.path();
        if !path.extension().is_some_and(|ext| ext == "md") {
            continue;
        }
        let slug = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

        let result = std::fs::read_to_string(&path)
            .map_err(|e| ContentError::Io(e.to_string()))
            .and_then(|text| parse_entry::<M>(slug, &text));

        match result {
            Ok(_) => tally.ok += 1,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Invalid content");
                tally.failed += 1;
            }
        }
    }
    Ok(tally)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_content_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../storefront/content");
        assert!(check(&dir).is_ok());
    }

    #[test]
    fn test_missing_directory_counts_nothing() {
        let tally = check_dir::<EventMeta>(Path::new("/nonexistent/celesta")).unwrap();
        assert_eq!(tally, Tally::default());
    }
}
