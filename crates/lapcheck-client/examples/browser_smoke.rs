/// Smoke-test for `ChromePage`.
///
/// Launches a headless Chromium, loads a tiny fixture that mimics the game's
/// crash handling, runs the built-in `crash` scenario, and verifies the
/// screenshot landed on disk. A second page without the game globals must
/// fail with a script error before any screenshot is taken.
///
/// Run with:
///   cargo run --example browser_smoke
use lapcheck_client::{BrowserOptions, ChromeSession};
use lapcheck_core::{AppError, ConsoleRunReporter, RunConfig, Scenario, ScenarioRunner};

const FIXTURE: &str = r#"<!DOCTYPE html>
<html>
<head><style>.hidden { display: none; }</style></head>
<body>
  <canvas id="gameCanvas" width="400" height="300"></canvas>
  <div id="game-over-overlay" class="hidden">
    <h2 id="game-over-message"></h2>
  </div>
  <script>
    let player = { crashed: false, finished: false };
    function checkGameEnd() {
      if (player.crashed) {
        document.getElementById('game-over-message').innerText = 'You crashed';
        document.getElementById('game-over-overlay').classList.remove('hidden');
      }
    }
  </script>
</body>
</html>
"#;

const NO_GAME: &str = r#"<!DOCTYPE html>
<html><body><h2 id="game-over-message">You crashed</h2></body></html>
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("index.html"), FIXTURE)?;
    let bare = tempfile::tempdir()?;
    std::fs::write(bare.path().join("index.html"), NO_GAME)?;

    println!("Launching headless browser…");
    let session = ChromeSession::launch(&BrowserOptions::default()).await?;
    let scenario = Scenario::builtin("crash").expect("crash scenario is built in");

    let page = session.new_page().await?;
    let runner = ScenarioRunner::new(&page, RunConfig::new(dir.path()).validate()?);
    let result = runner.run(&scenario, &ConsoleRunReporter::stdout()).await;

    let page = session.new_page().await?;
    let runner = ScenarioRunner::new(&page, RunConfig::new(bare.path()).validate()?);
    let missing = runner.run(&scenario, &ConsoleRunReporter::stdout()).await;

    session.close().await?;
    let report = result?;

    match missing {
        Err(AppError::ScriptError(msg)) => println!("Page without game globals: {msg}"),
        other => anyhow::bail!("expected a script error, got {other:?}"),
    }
    assert!(
        !bare.path().join("verification").exists(),
        "no screenshot should be taken after a script error"
    );

    assert!(report.passed(), "crash check failed: {:?}", report.checks);
    let shot = dir.path().join("verification/crash_message.png");
    let size = std::fs::metadata(&shot)?.len();
    assert!(size > 0, "screenshot is empty");

    println!("OK: {} bytes of PNG at {}", size, shot.display());
    Ok(())
}
