use std::future::Future;

use crate::error::AppError;
use crate::models::Point;

/// A single browser tab the runner can drive.
///
/// Implementations map these calls onto a real automation backend
/// (Chromium over CDP) or onto an in-memory fake for tests. Waiting and
/// retry policy live in the runner, not here: every method is one round
/// trip to the page.
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the load to finish.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Run `script` in the page's JavaScript context.
    ///
    /// Returns the completion value (or `Null` for `undefined`). An uncaught
    /// exception must surface as [`AppError::ScriptError`].
    fn evaluate(
        &self,
        script: &str,
    ) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;

    /// Whether an element matching `selector` exists and is rendered visible.
    fn is_visible(&self, selector: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// The rendered `innerText` of the first element matching `selector`.
    fn inner_text(&self, selector: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Centre of the element's bounding box in viewport coordinates.
    fn element_center(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Point, AppError>> + Send;

    /// Press the primary mouse button at `from`, move to `to`, release.
    fn drag(&self, from: Point, to: Point) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Single primary-button click at `at`.
    fn click(&self, at: Point) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Capture the current viewport as PNG bytes.
    fn screenshot(&self) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;
}
