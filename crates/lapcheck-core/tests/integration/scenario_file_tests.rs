use lapcheck_core::reporter::NullRunReporter;
use lapcheck_core::testutil::{MockElement, MockPage};
use lapcheck_core::{AppError, ScenarioResolver, ScenarioRunner};

use crate::integration::common::{fast_config, game_checkout};

const LAP_COUNTER: &str = r##"{
    "description": "Lap counter reads 0/1 on load",
    "steps": [
        {"action": "navigate", "page": "index.html"},
        {"action": "wait_for", "selector": "#lap-count", "timeout_ms": 100},
        {"action": "expect_text", "selector": "#lap-count", "equals": "0/1", "label": "Lap count"},
        {"action": "screenshot", "path": "shots/laps.png"}
    ]
}"##;

#[tokio::test]
async fn scenario_file_runs_end_to_end() {
    let dir = game_checkout();
    let scenarios = dir.path().join("scenarios");
    std::fs::create_dir(&scenarios).unwrap();
    std::fs::write(scenarios.join("laps.json"), LAP_COUNTER).unwrap();

    let resolved = ScenarioResolver::new(&scenarios).resolve("laps").unwrap();
    assert_eq!(resolved.scenario.name, "laps");

    let page = MockPage::new().with_element("#lap-count", MockElement::visible("0/1"));
    let runner = ScenarioRunner::new(&page, fast_config(dir.path()));
    let report = runner
        .run(&resolved.scenario, &NullRunReporter)
        .await
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.checks[0].label, "Lap count");
    assert!(dir.path().join("shots/laps.png").exists());
}

#[tokio::test]
async fn scenario_file_with_script_before_navigate_is_rejected() {
    let dir = game_checkout();
    let path = dir.path().join("early.json");
    std::fs::write(
        &path,
        r#"{"name": "early", "steps": [{"action": "evaluate", "script": "checkGameEnd()"}]}"#,
    )
    .unwrap();

    let err = ScenarioResolver::new(dir.path())
        .resolve(path.to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, AppError::ScenarioError(_)));
}

#[tokio::test]
async fn missing_element_text_is_a_hard_error() {
    let dir = game_checkout();
    std::fs::write(
        dir.path().join("ghost.json"),
        r##"{"steps": [
            {"action": "navigate", "page": "index.html"},
            {"action": "expect_text", "selector": "#ghost", "equals": "boo"}
        ]}"##,
    )
    .unwrap();

    let resolved = ScenarioResolver::new(dir.path()).resolve("ghost").unwrap();
    let page = MockPage::new();
    let runner = ScenarioRunner::new(&page, fast_config(dir.path()));

    let err = runner
        .run(&resolved.scenario, &NullRunReporter)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ElementNotFound(ref s) if s == "#ghost"));
}

#[test]
fn shipped_scenarios_are_valid() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios");
    let resolver = ScenarioResolver::new(&dir);

    let names = resolver.list().unwrap();
    assert!(names.contains(&"hud".to_string()), "{names:?}");
    for name in names {
        let resolved = resolver.resolve(&name).unwrap();
        assert_eq!(resolved.scenario.name, name);
    }
}
