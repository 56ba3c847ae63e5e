//! Input validation shared by the worker and API crates.

use url::Url;

use crate::error::{ModelError, ModelResult};

/// Validate a user-supplied media URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn validate_source_url(raw: &str) -> ModelResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ModelError::InvalidUrl("URL is empty".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| ModelError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ModelError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ModelError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    Ok(url)
}

/// Validate a single file name inside a job directory.
///
/// Rejects separators, parent references and hidden files.
pub fn validate_file_name(name: &str) -> ModelResult<&str> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(ModelError::InvalidFileName(name.to_string()));
    }
    Ok(name)
}
