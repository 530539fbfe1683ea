use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExceptionDetails};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use lapcheck_core::error::AppError;
use lapcheck_core::models::Point;
use lapcheck_core::traits::PageDriver;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::scripts;

/// Intermediate mouse positions sent between press and release of a drag.
const DRAG_STEPS: u32 = 5;

/// Launch settings for the browser process.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Explicit browser binary. Falls back to `$CHROME_BIN`, then well-known
    /// install locations, then `chromiumoxide`'s own lookup.
    pub chrome_bin: Option<PathBuf>,
    /// Window (and therefore viewport) size in CSS pixels.
    pub window: (u32, u32),
    pub launch_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_bin: None,
            window: (1280, 720),
            launch_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserOptions {
    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper at
    /// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
    /// We look for the real binary inside the snap first, then fall back to
    /// well-known system paths.
    fn resolve_binary(&self) -> Option<PathBuf> {
        if let Some(bin) = &self.chrome_bin {
            return Some(bin.clone());
        }

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

/// Parse a `WIDTHxHEIGHT` window size such as `1280x720`.
pub fn parse_window_size(raw: &str) -> Result<(u32, u32), AppError> {
    let invalid = || AppError::ConfigError(format!("Invalid window size '{raw}': expected WxH"));

    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// A running Chromium process driven over the Chrome DevTools Protocol.
///
/// Owns the CDP handler task; [`close`](Self::close) shuts down both.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launches Chromium with the given options.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        if let Some(bin) = options.resolve_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        builder = if options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        let (width, height) = options.window;
        let config = builder
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            // Let file:// pages load sibling scripts.
            .arg("--allow-file-access-from-files")
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let launched = tokio::time::timeout(options.launch_timeout, Browser::launch(config))
            .await
            .map_err(|_| {
                AppError::BrowserError(format!(
                    "Browser did not start within {} s",
                    options.launch_timeout.as_secs()
                ))
            })?;
        let (browser, mut handler) = launched
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::debug!("Browser CDP handler stopped: {event:?}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Opens a blank tab.
    pub async fn new_page(&self) -> Result<ChromePage, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;
        Ok(ChromePage { page })
    }

    /// Closes the browser and waits for the process to exit.
    pub async fn close(mut self) -> Result<(), AppError> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to close browser: {e}")));
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// One browser tab implementing [`PageDriver`].
#[derive(Clone)]
pub struct ChromePage {
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl ChromePage {
    async fn mouse(
        &self,
        kind: DispatchMouseEventType,
        at: Point,
        buttons: i64,
    ) -> Result<(), AppError> {
        let is_move = matches!(kind, DispatchMouseEventType::MouseMoved);
        let mut builder = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(at.x)
            .y(at.y)
            .button(MouseButton::Left)
            .buttons(buttons);
        if !is_move {
            builder = builder.click_count(1);
        }
        let params = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Invalid mouse event: {e}")))?;

        self.page
            .execute(params)
            .await
            .map_err(|e| AppError::BrowserError(format!("Mouse input failed: {e}")))?;
        Ok(())
    }
}

/// Human-readable message for an uncaught page exception.
fn describe_exception(details: &ExceptionDetails) -> String {
    details
        .exception
        .as_ref()
        .and_then(|ex| ex.description.clone())
        .unwrap_or_else(|| details.text.clone())
}

impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::NavigationError(format!("Failed to navigate to {url}: {e}")))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AppError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(AppError::ScriptError)?;

        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| AppError::BrowserError(format!("Runtime.evaluate failed: {e}")))?;

        if let Some(details) = &response.result.exception_details {
            return Err(AppError::ScriptError(describe_exception(details)));
        }

        Ok(response
            .result
            .result
            .value
            .clone()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, AppError> {
        let value = self.evaluate(&scripts::visibility_probe(selector)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> Result<String, AppError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| AppError::ElementNotFound(selector.to_string()))?;

        let text = element
            .inner_text()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read text of {selector}: {e}")))?;

        Ok(text.unwrap_or_default())
    }

    async fn element_center(&self, selector: &str) -> Result<Point, AppError> {
        let value = self.evaluate(&scripts::bounding_rect(selector)).await?;
        if value.is_null() {
            return Err(AppError::ElementNotFound(selector.to_string()));
        }
        let rect: Rect = serde_json::from_value(value)?;
        Ok(Point::new(
            rect.x + rect.width / 2.0,
            rect.y + rect.height / 2.0,
        ))
    }

    async fn drag(&self, from: Point, to: Point) -> Result<(), AppError> {
        self.mouse(DispatchMouseEventType::MouseMoved, from, 0).await?;
        self.mouse(DispatchMouseEventType::MousePressed, from, 1).await?;
        for i in 1..=DRAG_STEPS {
            let t = f64::from(i) / f64::from(DRAG_STEPS);
            let at = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            self.mouse(DispatchMouseEventType::MouseMoved, at, 1).await?;
        }
        self.mouse(DispatchMouseEventType::MouseReleased, to, 0).await
    }

    async fn click(&self, at: Point) -> Result<(), AppError> {
        self.mouse(DispatchMouseEventType::MouseMoved, at, 0).await?;
        self.mouse(DispatchMouseEventType::MousePressed, at, 1).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, at, 0).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AppError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| AppError::ScreenshotError(format!("Screenshot failed: {e}")))
    }
}
