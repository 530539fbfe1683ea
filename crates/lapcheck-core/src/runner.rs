use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::error::AppError;
use crate::models::{Artifact, CheckResult, RunReport, compute_hash};
use crate::reporter::{RunEvent, RunReporter};
use crate::scenario::{Scenario, Step};
use crate::traits::PageDriver;
use crate::util::{is_local_page, page_url};

/// Executes scenarios against a page: navigate → poke state → wait → check → capture.
///
/// Generic over the page backend via [`PageDriver`], so the full step logic
/// is testable without a browser.
pub struct ScenarioRunner<'a, P: PageDriver> {
    page: &'a P,
    config: RunConfig,
}

/// Results accumulated while steps execute.
#[derive(Default)]
struct RunState {
    checks: Vec<CheckResult>,
    artifacts: Vec<Artifact>,
}

impl<'a, P: PageDriver> ScenarioRunner<'a, P> {
    pub fn new(page: &'a P, config: RunConfig) -> Self {
        Self { page, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every step of `scenario` in order.
    ///
    /// Hard failures (navigation, script exceptions, wait timeouts, capture
    /// errors) abort with `Err`. Check failures are recorded in the report
    /// and the remaining steps still run.
    pub async fn run<R: RunReporter>(
        &self,
        scenario: &Scenario,
        reporter: &R,
    ) -> Result<RunReport, AppError> {
        scenario.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        reporter.report(RunEvent::Started {
            run_id,
            scenario: &scenario.name,
        });

        let mut state = RunState::default();
        for (i, step) in scenario.steps.iter().enumerate() {
            tracing::debug!(step = i + 1, action = step.action(), "Executing step");
            self.execute(step, &mut state, reporter).await?;
        }

        let report = RunReport {
            run_id,
            scenario: scenario.name.clone(),
            started_at,
            finished_at: Utc::now(),
            checks: state.checks,
            artifacts: state.artifacts,
        };
        reporter.report(RunEvent::Finished { report: &report });

        Ok(report)
    }

    async fn execute<R: RunReporter>(
        &self,
        step: &Step,
        state: &mut RunState,
        reporter: &R,
    ) -> Result<(), AppError> {
        match step {
            Step::Navigate { page } => {
                let page = match &self.config.page_override {
                    Some(over) if is_local_page(page) => over.as_str(),
                    _ => page.as_str(),
                };
                let url = page_url(&self.config.base_dir, page)?;
                reporter.report(RunEvent::Loading { url: &url });
                self.page.goto(&url).await?;
            }

            Step::Evaluate { script, label } => {
                reporter.report(RunEvent::Evaluating {
                    label: label.as_deref(),
                });
                let value = self.page.evaluate(script).await?;
                tracing::debug!(%value, "Script completed");
            }

            Step::WaitFor {
                selector,
                timeout_ms,
            } => {
                let timeout = self.timeout_for(*timeout_ms);
                reporter.report(RunEvent::Waiting {
                    selector,
                    timeout_ms: timeout.as_millis() as u64,
                });
                if !self.wait_visible(selector, timeout).await? {
                    return Err(AppError::Timeout {
                        selector: selector.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }

            Step::ExpectText {
                selector,
                equals,
                label,
            } => {
                let text = self.page.inner_text(selector).await?;
                let label = label.as_deref().unwrap_or(selector.as_str());
                reporter.report(RunEvent::TextRead {
                    label,
                    selector,
                    text: &text,
                });

                let check = CheckResult {
                    label: label.to_string(),
                    selector: selector.clone(),
                    expected: Some(equals.clone()),
                    passed: text == *equals,
                    actual: Some(text),
                };
                reporter.report(RunEvent::CheckFinished { check: &check });
                state.checks.push(check);
            }

            Step::ExpectVisible {
                selector,
                timeout_ms,
            } => {
                let timeout = self.timeout_for(*timeout_ms);
                reporter.report(RunEvent::Waiting {
                    selector,
                    timeout_ms: timeout.as_millis() as u64,
                });
                let visible = self.wait_visible(selector, timeout).await?;

                let check = CheckResult {
                    label: format!("{selector} visible"),
                    selector: selector.clone(),
                    expected: None,
                    actual: None,
                    passed: visible,
                };
                reporter.report(RunEvent::CheckFinished { check: &check });
                state.checks.push(check);
            }

            Step::Drag { selector, dx, dy } => {
                let from = self.page.element_center(selector).await?;
                reporter.report(RunEvent::Pointer {
                    action: "drag",
                    selector,
                    at: from,
                });
                self.page.drag(from, from.offset(*dx, *dy)).await?;
            }

            Step::Click { selector, dx, dy } => {
                let at = self.page.element_center(selector).await?.offset(*dx, *dy);
                reporter.report(RunEvent::Pointer {
                    action: "click",
                    selector,
                    at,
                });
                self.page.click(at).await?;
            }

            Step::Screenshot { path } => {
                let artifact = self.capture(path).await?;
                reporter.report(RunEvent::ScreenshotSaved {
                    path,
                    bytes: artifact.bytes,
                });
                state.artifacts.push(artifact);
            }
        }

        Ok(())
    }

    fn timeout_for(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.wait_timeout)
    }

    /// Poll until `selector` is visible. `Ok(false)` once `timeout` elapses.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<bool, AppError> {
        let poll = self.config.poll_interval.min(timeout);
        let result = tokio::time::timeout(timeout, async {
            loop {
                if self.page.is_visible(selector).await? {
                    return Ok::<bool, AppError>(true);
                }
                tokio::time::sleep(poll).await;
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Ok(false),
        }
    }

    /// Take a screenshot and write it under the base directory, replacing
    /// any previous file at the same path.
    async fn capture(&self, path: &str) -> Result<Artifact, AppError> {
        let png = self.page.screenshot().await?;
        if png.is_empty() {
            return Err(AppError::ScreenshotError(format!(
                "browser returned an empty image for {path}"
            )));
        }

        let target = self.config.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &png).await?;

        Ok(Artifact {
            path: path.to_string(),
            bytes: png.len() as u64,
            sha256: compute_hash(&png),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ConsoleRunReporter, NullRunReporter};
    use crate::testutil::*;

    fn game_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<canvas id=\"gameCanvas\"></canvas>")
            .unwrap();
        dir
    }

    fn config(dir: &tempfile::TempDir) -> RunConfig {
        RunConfig::new(dir.path())
            .with_wait_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn crash() -> Scenario {
        Scenario::builtin("crash").unwrap()
    }

    #[tokio::test]
    async fn crash_scenario_passes_with_expected_message() {
        let dir = game_dir();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));

        let report = runner.run(&crash(), &NullRunReporter).await.unwrap();

        assert!(report.passed());
        assert_eq!(report.scenario, "crash");
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].actual.as_deref(), Some("You crashed"));

        let shot = dir.path().join("verification/crash_message.png");
        assert_eq!(std::fs::read(&shot).unwrap(), PNG_STUB);
        assert_eq!(report.artifacts[0].bytes, PNG_STUB.len() as u64);
        assert_eq!(report.artifacts[0].sha256, compute_hash(PNG_STUB));
    }

    #[tokio::test]
    async fn crash_scenario_drives_page_in_order() {
        let dir = game_dir();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));
        runner.run(&crash(), &NullRunReporter).await.unwrap();

        let calls = page.calls();
        assert!(calls[0].starts_with("goto file://"), "{calls:?}");
        assert!(calls[0].ends_with("/index.html"), "{calls:?}");
        assert_eq!(calls[1], format!("evaluate {CRASH_SCRIPT}"));
        assert_eq!(calls[2], "is_visible #game-over-message");
        assert_eq!(calls[3], "inner_text #game-over-message");
        assert_eq!(calls[4], "screenshot");
        assert_eq!(calls.len(), 5);
    }

    #[tokio::test]
    async fn mismatch_is_recorded_and_screenshot_still_taken() {
        let dir = game_dir();
        let page = MockPage::game("You Crashed into the Grass!");
        let runner = ScenarioRunner::new(&page, config(&dir));

        let report = runner.run(&crash(), &NullRunReporter).await.unwrap();

        assert!(!report.passed());
        let failed: Vec<_> = report.failed_checks().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].expected.as_deref(), Some("You crashed"));
        assert_eq!(
            failed[0].actual.as_deref(),
            Some("You Crashed into the Grass!")
        );
        assert!(dir.path().join("verification/crash_message.png").exists());
    }

    #[tokio::test]
    async fn console_transcript_matches_crash_run() {
        let dir = game_dir();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));
        let reporter = ConsoleRunReporter::new(Vec::new());

        runner.run(&crash(), &reporter).await.unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("Loading file://"));
        assert_eq!(
            &lines[1..],
            [
                "Triggering crash...",
                "Game over message: 'You crashed'",
                "SUCCESS: Message is correct.",
                "Screenshot saved to verification/crash_message.png",
            ]
        );
    }

    #[tokio::test]
    async fn missing_game_globals_fail_the_run() {
        let dir = game_dir();
        let page = MockPage::new().with_script_error(
            CRASH_SCRIPT,
            "ReferenceError: player is not defined",
        );
        let runner = ScenarioRunner::new(&page, config(&dir));

        let err = runner.run(&crash(), &NullRunReporter).await.unwrap_err();

        assert!(matches!(err, AppError::ScriptError(ref m) if m.contains("player")));
        assert!(!page.calls().iter().any(|c| c == "screenshot"));
        assert!(!dir.path().join("verification").exists());
    }

    #[tokio::test]
    async fn message_never_shown_times_out() {
        let dir = game_dir();
        // Crash script does nothing: overlay stays hidden.
        let page = MockPage::new()
            .with_element("#game-over-message", MockElement::hidden("You Crashed!"));
        let runner = ScenarioRunner::new(
            &page,
            config(&dir).with_wait_timeout(Duration::from_millis(40)),
        );

        let err = runner.run(&crash(), &NullRunReporter).await.unwrap_err();

        match err {
            AppError::Timeout {
                selector,
                timeout_ms,
            } => {
                assert_eq!(selector, "#game-over-message");
                assert_eq!(timeout_ms, 40);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        let polls = page
            .calls()
            .iter()
            .filter(|c| c.starts_with("is_visible"))
            .count();
        assert!(polls > 1, "expected repeated polling, got {polls}");
    }

    #[tokio::test]
    async fn missing_page_fails_before_browser_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));

        let err = runner.run(&crash(), &NullRunReporter).await.unwrap_err();

        assert!(matches!(err, AppError::NavigationError(_)));
        assert!(page.calls().is_empty());
    }

    #[tokio::test]
    async fn navigation_error_propagates() {
        let dir = game_dir();
        let page = MockPage::game("You crashed")
            .with_goto_error(AppError::NavigationError("net::ERR_ABORTED".into()));
        let runner = ScenarioRunner::new(&page, config(&dir));

        let err = runner.run(&crash(), &NullRunReporter).await.unwrap_err();
        assert!(matches!(err, AppError::NavigationError(ref m) if m.contains("ERR_ABORTED")));
    }

    #[tokio::test]
    async fn empty_screenshot_is_an_error() {
        let dir = game_dir();
        let page = MockPage::game("You crashed").with_screenshot(&[]);
        let runner = ScenarioRunner::new(&page, config(&dir));

        let err = runner.run(&crash(), &NullRunReporter).await.unwrap_err();
        assert!(matches!(err, AppError::ScreenshotError(_)));
        assert!(!dir.path().join("verification/crash_message.png").exists());
    }

    #[tokio::test]
    async fn page_override_replaces_local_pages() {
        let dir = game_dir();
        std::fs::write(dir.path().join("race.html"), "<html></html>").unwrap();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir).with_page_override("race.html"));

        runner.run(&crash(), &NullRunReporter).await.unwrap();

        assert!(page.loaded_url().unwrap().ends_with("/race.html"));
    }

    #[tokio::test]
    async fn infrastructure_scenario_pans_and_clicks() {
        let dir = game_dir();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));
        let scenario = Scenario::builtin("infrastructure").unwrap();

        let report = runner.run(&scenario, &NullRunReporter).await.unwrap();

        assert!(report.passed());
        assert_eq!(report.artifacts.len(), 3);
        let calls = page.calls();
        assert!(calls.contains(&"drag 640,360 -> 440,360".to_string()), "{calls:?}");
        assert!(calls.contains(&"click 640,360".to_string()), "{calls:?}");
        for name in ["initial", "panned", "moved"] {
            assert!(dir.path().join(format!("verification/{name}.png")).exists());
        }
    }

    #[tokio::test]
    async fn invisible_canvas_fails_check_without_aborting() {
        let dir = game_dir();
        let page = MockPage::new().with_element("#gameCanvas", MockElement::hidden(""));
        let runner = ScenarioRunner::new(
            &page,
            config(&dir).with_wait_timeout(Duration::from_millis(20)),
        );
        let scenario = Scenario::builtin("infrastructure").unwrap();

        let report = runner.run(&scenario, &NullRunReporter).await.unwrap();

        assert!(!report.passed());
        assert_eq!(report.checks[0].label, "#gameCanvas visible");
        assert_eq!(report.artifacts.len(), 3);
    }

    #[tokio::test]
    async fn invalid_scenario_is_rejected_before_any_call() {
        let dir = game_dir();
        let page = MockPage::game("You crashed");
        let runner = ScenarioRunner::new(&page, config(&dir));
        let scenario = Scenario {
            name: "bad".into(),
            description: String::new(),
            steps: vec![Step::Screenshot {
                path: "x.png".into(),
            }],
        };

        let err = runner.run(&scenario, &NullRunReporter).await.unwrap_err();
        assert!(matches!(err, AppError::ScenarioError(_)));
        assert!(page.calls().is_empty());
    }
}
