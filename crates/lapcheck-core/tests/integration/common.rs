use std::path::Path;
use std::time::Duration;

use lapcheck_core::RunConfig;
use tempfile::TempDir;

/// Minimal stand-in for the game page; the mock driver never parses it,
/// but navigation requires the file to exist.
pub const GAME_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
  <canvas id="gameCanvas" width="1000" height="800"></canvas>
  <div id="game-over-overlay" class="overlay hidden">
    <h2 id="game-over-message">You Crashed!</h2>
  </div>
</body>
</html>
"#;

/// Temp directory laid out like the game checkout: `index.html` at the root.
pub fn game_checkout() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("index.html"), GAME_HTML).expect("write index.html");
    dir
}

pub fn fast_config(base_dir: &Path) -> RunConfig {
    RunConfig::new(base_dir)
        .with_wait_timeout(Duration::from_millis(250))
        .with_poll_interval(Duration::from_millis(5))
        .validate()
        .expect("valid config")
}
