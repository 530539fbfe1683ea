use std::io::Write;
use std::sync::Mutex;

use uuid::Uuid;

use crate::models::{CheckResult, Point, RunReport};

/// Events emitted by the runner for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    Started {
        run_id: Uuid,
        scenario: &'a str,
    },
    Loading {
        url: &'a str,
    },
    Evaluating {
        label: Option<&'a str>,
    },
    Waiting {
        selector: &'a str,
        timeout_ms: u64,
    },
    TextRead {
        label: &'a str,
        selector: &'a str,
        text: &'a str,
    },
    CheckFinished {
        check: &'a CheckResult,
    },
    Pointer {
        action: &'static str,
        selector: &'a str,
        at: Point,
    },
    ScreenshotSaved {
        path: &'a str,
        bytes: u64,
    },
    Finished {
        report: &'a RunReport,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRunReporter;

impl RunReporter for NullRunReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Started { run_id, scenario } => {
                tracing::info!(%run_id, %scenario, "Run started");
            }
            RunEvent::Loading { url } => {
                tracing::info!(%url, "Loading page");
            }
            RunEvent::Evaluating { label } => {
                tracing::info!(label = label.unwrap_or("script"), "Evaluating in page");
            }
            RunEvent::Waiting {
                selector,
                timeout_ms,
            } => {
                tracing::debug!(%selector, %timeout_ms, "Waiting for selector");
            }
            RunEvent::TextRead {
                label,
                selector,
                text,
            } => {
                tracing::info!(%label, %selector, %text, "Read element text");
            }
            RunEvent::CheckFinished { check } => {
                if check.passed {
                    tracing::info!(label = %check.label, selector = %check.selector, "Check passed");
                } else {
                    tracing::warn!(
                        label = %check.label,
                        selector = %check.selector,
                        expected = ?check.expected,
                        actual = ?check.actual,
                        "Check failed"
                    );
                }
            }
            RunEvent::Pointer {
                action,
                selector,
                at,
            } => {
                tracing::debug!(%action, %selector, x = at.x, y = at.y, "Pointer input");
            }
            RunEvent::ScreenshotSaved { path, bytes } => {
                tracing::info!(%path, %bytes, "Screenshot saved");
            }
            RunEvent::Finished { report } => {
                tracing::info!(
                    run_id = %report.run_id,
                    checks = report.checks.len(),
                    artifacts = report.artifacts.len(),
                    passed = report.passed(),
                    "Run finished"
                );
            }
        }
    }
}

/// Reporter that prints human-readable status lines.
///
/// Writes to stdout by default; the writer is swappable for tests.
pub struct ConsoleRunReporter<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleRunReporter {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleRunReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // Console output is best-effort; a closed stdout must not fail the run.
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl<W: Write + Send> RunReporter for ConsoleRunReporter<W> {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Loading { url } => self.line(format_args!("Loading {url}")),
            RunEvent::Evaluating { label } => {
                self.line(format_args!("{}...", label.unwrap_or("Evaluating script")))
            }
            RunEvent::TextRead { label, text, .. } => {
                self.line(format_args!("{label}: '{text}'"))
            }
            RunEvent::CheckFinished { check } => match (&check.expected, check.passed) {
                (Some(_), true) => self.line(format_args!("SUCCESS: Message is correct.")),
                (Some(_), false) => self.line(format_args!("FAILURE: Message is incorrect.")),
                (None, true) => {
                    self.line(format_args!("SUCCESS: {} is visible.", check.selector))
                }
                (None, false) => {
                    self.line(format_args!("FAILURE: {} is not visible.", check.selector))
                }
            },
            RunEvent::ScreenshotSaved { path, .. } => {
                self.line(format_args!("Screenshot saved to {path}"))
            }
            RunEvent::Started { .. }
            | RunEvent::Waiting { .. }
            | RunEvent::Pointer { .. }
            | RunEvent::Finished { .. } => {}
        }
    }
}
