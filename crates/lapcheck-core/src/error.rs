use thiserror::Error;

/// Application-wide error types for lapcheck.
#[derive(Error, Debug)]
pub enum AppError {
    /// Browser process could not be launched or the CDP connection failed.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Page navigation failed (missing file, bad URL, load error).
    #[error("Navigation error: {0}")]
    NavigationError(String),

    /// A script evaluated in the page threw an exception.
    #[error("Script error: {0}")]
    ScriptError(String),

    /// No element matched the selector.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Waiting for a selector exceeded its deadline.
    #[error("Timed out after {timeout_ms} ms waiting for '{selector}'")]
    Timeout { selector: String, timeout_ms: u64 },

    /// Screenshot capture returned no usable image.
    #[error("Screenshot error: {0}")]
    ScreenshotError(String),

    /// Scenario file is missing, malformed, or fails validation.
    #[error("Scenario error: {0}")]
    ScenarioError(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Stable machine-readable name for this error, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BrowserError(_) => "browser_error",
            AppError::NavigationError(_) => "navigation_error",
            AppError::ScriptError(_) => "script_error",
            AppError::ElementNotFound(_) => "element_not_found",
            AppError::Timeout { .. } => "timeout",
            AppError::ScreenshotError(_) => "screenshot_error",
            AppError::ScenarioError(_) => "scenario_error",
            AppError::ConfigError(_) => "config_error",
            AppError::IoError(_) => "io_error",
            AppError::SerializationError(_) => "serialization_error",
            AppError::Generic(_) => "internal_error",
        }
    }

    /// Returns true if the error originated inside the page under test
    /// rather than in the harness or the browser process.
    pub fn is_page_fault(&self) -> bool {
        matches!(
            self,
            AppError::ScriptError(_) | AppError::ElementNotFound(_) | AppError::Timeout { .. }
        )
    }
}
