use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Default deadline for `wait_for` / `expect_visible` steps.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between visibility polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settings for a single scenario run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory relative pages and artifact paths are resolved against.
    pub base_dir: PathBuf,
    /// Deadline for steps that don't carry their own `timeout_ms`.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Replaces the page of every `navigate` step that targets a local path.
    pub page_override: Option<String>,
}

impl RunConfig {
    /// Config rooted at `base_dir` with default timeouts.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_override: None,
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_page_override(mut self, page: impl Into<String>) -> Self {
        self.page_override = Some(page.into());
        self
    }

    /// Check values and make `base_dir` absolute.
    ///
    /// `file://` URLs need an absolute path, so a relative base directory is
    /// joined onto the current working directory.
    pub fn validate(mut self) -> Result<Self, AppError> {
        if self.wait_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "wait timeout must be greater than zero".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(AppError::ConfigError(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.poll_interval > self.wait_timeout {
            self.poll_interval = self.wait_timeout;
        }
        if !self.base_dir.is_absolute() {
            self.base_dir = std::env::current_dir()?.join(&self.base_dir);
        }
        if !self.base_dir.is_dir() {
            return Err(AppError::ConfigError(format!(
                "base directory {} does not exist",
                self.base_dir.display()
            )));
        }
        Ok(self)
    }

    /// Resolve a scenario-relative path against the base directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::new("/tmp");
        assert_eq!(cfg.wait_timeout, Duration::from_secs(30));
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert!(cfg.page_override.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::new(dir.path())
            .with_wait_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_poll_interval_clamped_to_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(dir.path())
            .with_wait_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(500))
            .validate()
            .unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_missing_base_dir_rejected() {
        let err = RunConfig::new("/definitely/not/here/lapcheck")
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_resolve() {
        let cfg = RunConfig::new("/srv/game");
        assert_eq!(
            cfg.resolve("verification/crash_message.png"),
            PathBuf::from("/srv/game/verification/crash_message.png")
        );
        assert_eq!(cfg.resolve("/tmp/shot.png"), PathBuf::from("/tmp/shot.png"));
    }
}
