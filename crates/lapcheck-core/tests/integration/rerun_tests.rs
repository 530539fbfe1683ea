use lapcheck_core::reporter::NullRunReporter;
use lapcheck_core::testutil::{MockPage, PNG_STUB};
use lapcheck_core::{Scenario, ScenarioRunner, compute_hash};

use crate::integration::common::{fast_config, game_checkout};

#[tokio::test]
async fn second_run_overwrites_screenshot() {
    let dir = game_checkout();
    let shot = dir.path().join("verification/crash_message.png");
    std::fs::create_dir_all(shot.parent().unwrap()).unwrap();
    std::fs::write(&shot, b"stale screenshot from an earlier run").unwrap();

    let page = MockPage::game("You crashed");
    let runner = ScenarioRunner::new(&page, fast_config(dir.path()));
    let scenario = Scenario::builtin("crash").unwrap();

    let first = runner.run(&scenario, &NullRunReporter).await.unwrap();
    let second = runner.run(&scenario, &NullRunReporter).await.unwrap();

    assert!(first.passed());
    assert!(second.passed());
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(std::fs::read(&shot).unwrap(), PNG_STUB);
    assert_eq!(first.artifacts[0].sha256, second.artifacts[0].sha256);
    assert_eq!(second.artifacts[0].sha256, compute_hash(PNG_STUB));
}

#[tokio::test]
async fn screenshot_has_non_zero_size() {
    let dir = game_checkout();
    let page = MockPage::game("You crashed");
    let runner = ScenarioRunner::new(&page, fast_config(dir.path()));

    let report = runner
        .run(&Scenario::builtin("crash").unwrap(), &NullRunReporter)
        .await
        .unwrap();

    let meta = std::fs::metadata(dir.path().join("verification/crash_message.png")).unwrap();
    assert!(meta.len() > 0);
    assert_eq!(meta.len(), report.artifacts[0].bytes);
}

#[tokio::test]
async fn report_serializes_for_json_output() {
    let dir = game_checkout();
    let page = MockPage::game("You crashed");
    let runner = ScenarioRunner::new(&page, fast_config(dir.path()));

    let report = runner
        .run(&Scenario::builtin("finish").unwrap(), &NullRunReporter)
        .await
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["scenario"], "finish");
    assert_eq!(json["checks"][0]["passed"], true);
    assert_eq!(json["checks"][0]["actual"], "Race Finished! Lap Complete!");
    assert_eq!(json["artifacts"][0]["path"], "verification/finish_message.png");
    assert!(json["started_at"].is_string());
}
