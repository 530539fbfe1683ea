use std::path::Path;

use url::Url;

use crate::error::AppError;

/// Turn a scenario page reference into a URL the browser can load.
///
/// Absolute URLs (`file://`, `http://`, `about:blank`, ...) pass through.
/// Anything else is a path relative to `base_dir`; it must exist and is
/// converted to a percent-encoded `file://` URL.
pub fn page_url(base_dir: &Path, page: &str) -> Result<String, AppError> {
    if let Ok(url) = Url::parse(page) {
        // Single-letter schemes are Windows drive letters, not URLs.
        if url.scheme().len() > 1 {
            return Ok(url.to_string());
        }
    }

    let path = base_dir.join(page);
    if !path.is_file() {
        return Err(AppError::NavigationError(format!(
            "page {} does not exist",
            path.display()
        )));
    }

    let path = path.canonicalize()?;
    Url::from_file_path(&path)
        .map(|u| u.to_string())
        .map_err(|()| {
            AppError::NavigationError(format!(
                "cannot build a file URL from {}",
                path.display()
            ))
        })
}

/// Whether a page reference is a local path (as opposed to a URL).
pub fn is_local_page(page: &str) -> bool {
    match Url::parse(page) {
        Ok(url) => url.scheme().len() <= 1,
        Err(_) => true,
    }
}

/// Derive a scenario name from a file path.
///
/// Extracts the file stem (name without extension).
/// Example: `"scenarios/crash.json"` → `"crash"`
pub fn derive_scenario_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string()
}

/// JavaScript string literal for `value`, safe to splice into a script.
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
