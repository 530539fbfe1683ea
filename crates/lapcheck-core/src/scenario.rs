use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::util::derive_scenario_name;

/// Names of the scenarios compiled into the binary.
pub const BUILTIN_SCENARIOS: &[&str] = &["crash", "finish", "infrastructure"];

/// One action against the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a page: a URL, or a path relative to the base directory.
    Navigate { page: String },

    /// Run a script in the page context. Exceptions abort the run.
    Evaluate {
        script: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    /// Block until the selector is visible. Timing out aborts the run.
    WaitFor {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Compare the element's inner text to `equals`. Recorded as a check.
    ExpectText {
        selector: String,
        equals: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    /// Wait for the selector to become visible. Recorded as a check.
    ExpectVisible {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Drag from the element's centre by `(dx, dy)` CSS pixels.
    Drag { selector: String, dx: f64, dy: f64 },

    /// Click the element's centre, optionally offset.
    Click {
        selector: String,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },

    /// Capture the viewport to `path`, overwriting any existing file.
    Screenshot { path: String },
}

impl Step {
    /// Short name of the action, as it appears in scenario files.
    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Evaluate { .. } => "evaluate",
            Step::WaitFor { .. } => "wait_for",
            Step::ExpectText { .. } => "expect_text",
            Step::ExpectVisible { .. } => "expect_visible",
            Step::Drag { .. } => "drag",
            Step::Click { .. } => "click",
            Step::Screenshot { .. } => "screenshot",
        }
    }

    fn validate(&self, index: usize) -> Result<(), AppError> {
        let empty = |field: &str| {
            AppError::ScenarioError(format!(
                "step {} ({}): `{field}` must not be empty",
                index + 1,
                self.action()
            ))
        };

        match self {
            Step::Navigate { page } if page.trim().is_empty() => Err(empty("page")),
            Step::Evaluate { script, .. } if script.trim().is_empty() => Err(empty("script")),
            Step::WaitFor { timeout_ms: Some(0), .. }
            | Step::ExpectVisible { timeout_ms: Some(0), .. } => Err(AppError::ScenarioError(
                format!("step {} ({}): `timeout_ms` must be positive", index + 1, self.action()),
            )),
            Step::WaitFor { selector, .. }
            | Step::ExpectText { selector, .. }
            | Step::ExpectVisible { selector, .. }
            | Step::Drag { selector, .. }
            | Step::Click { selector, .. }
                if selector.trim().is_empty() =>
            {
                Err(empty("selector"))
            }
            Step::Screenshot { path } if path.trim().is_empty() => Err(empty("path")),
            _ => Ok(()),
        }
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Defaults to the file stem when loaded from a file.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Reject scenarios the runner can't execute meaningfully.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::ScenarioError("scenario name must not be empty".into()));
        }
        if self.steps.is_empty() {
            return Err(AppError::ScenarioError(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }

        let mut navigated = false;
        for (i, step) in self.steps.iter().enumerate() {
            step.validate(i)?;
            match step {
                Step::Navigate { .. } => navigated = true,
                _ if !navigated => {
                    return Err(AppError::ScenarioError(format!(
                        "scenario '{}': step {} ({}) runs before any navigate step",
                        self.name,
                        i + 1,
                        step.action()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Look up a scenario compiled into the binary.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "crash" => Some(crash()),
            "finish" => Some(finish()),
            "infrastructure" => Some(infrastructure()),
            _ => None,
        }
    }

    /// Paths of all screenshots this scenario writes.
    pub fn screenshot_paths(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s {
            Step::Screenshot { path } => Some(path.as_str()),
            _ => None,
        })
    }
}

fn crash() -> Scenario {
    Scenario {
        name: "crash".into(),
        description: "Force a crash and verify the game-over message".into(),
        steps: vec![
            Step::Navigate {
                page: "index.html".into(),
            },
            Step::Evaluate {
                script: "player.crashed = true;\ncheckGameEnd();".into(),
                label: Some("Triggering crash".into()),
            },
            Step::WaitFor {
                selector: "#game-over-message".into(),
                timeout_ms: None,
            },
            Step::ExpectText {
                selector: "#game-over-message".into(),
                equals: "You crashed".into(),
                label: Some("Game over message".into()),
            },
            Step::Screenshot {
                path: "verification/crash_message.png".into(),
            },
        ],
    }
}

fn finish() -> Scenario {
    Scenario {
        name: "finish".into(),
        description: "Force a completed lap and verify the finish message".into(),
        steps: vec![
            Step::Navigate {
                page: "index.html".into(),
            },
            Step::Evaluate {
                script: "player.finished = true;\ncheckGameEnd();".into(),
                label: Some("Finishing lap".into()),
            },
            Step::WaitFor {
                selector: "#game-over-message".into(),
                timeout_ms: None,
            },
            Step::ExpectText {
                selector: "#game-over-message".into(),
                equals: "Race Finished! Lap Complete!".into(),
                label: Some("Game over message".into()),
            },
            Step::Screenshot {
                path: "verification/finish_message.png".into(),
            },
        ],
    }
}

fn infrastructure() -> Scenario {
    let canvas = "#gameCanvas".to_string();
    Scenario {
        name: "infrastructure".into(),
        description: "Load the game, pan the camera, and make one move".into(),
        steps: vec![
            Step::Navigate {
                page: "index.html".into(),
            },
            Step::ExpectVisible {
                selector: canvas.clone(),
                timeout_ms: None,
            },
            Step::Screenshot {
                path: "verification/initial.png".into(),
            },
            // Dragging left moves the camera right.
            Step::Drag {
                selector: canvas.clone(),
                dx: -200.0,
                dy: 0.0,
            },
            Step::Screenshot {
                path: "verification/panned.png".into(),
            },
            Step::Click {
                selector: canvas,
                dx: 0.0,
                dy: 0.0,
            },
            Step::Screenshot {
                path: "verification/moved.png".into(),
            },
        ],
    }
}

/// A loaded scenario and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedScenario {
    /// `None` for built-in scenarios.
    pub path: Option<PathBuf>,
    pub scenario: Scenario,
}

/// Resolves scenario references (file paths, names in the scenarios
/// directory, or built-in names) to validated scenarios.
pub struct ScenarioResolver {
    scenarios_dir: PathBuf,
}

impl ScenarioResolver {
    pub fn new(scenarios_dir: impl Into<PathBuf>) -> Self {
        Self {
            scenarios_dir: scenarios_dir.into(),
        }
    }

    /// Resolve a scenario reference.
    ///
    /// Accepts, in order of precedence:
    /// - A direct file path (e.g. `scenarios/crash.json`)
    /// - A name with a matching `<scenarios_dir>/<name>.json`
    /// - A built-in name (see [`BUILTIN_SCENARIOS`])
    pub fn resolve(&self, scenario_ref: &str) -> Result<ResolvedScenario, AppError> {
        let direct = PathBuf::from(scenario_ref);
        if direct.is_file() {
            return Self::load(&direct);
        }

        let named = self.scenarios_dir.join(format!("{scenario_ref}.json"));
        if named.is_file() {
            return Self::load(&named);
        }

        match Scenario::builtin(scenario_ref) {
            Some(scenario) => Ok(ResolvedScenario {
                path: None,
                scenario,
            }),
            None => Err(AppError::ScenarioError(format!(
                "Scenario not found: {scenario_ref}"
            ))),
        }
    }

    /// Names of every scenario available: built-ins, then files in the
    /// scenarios directory. Sorted, deduplicated.
    pub fn list(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = BUILTIN_SCENARIOS.iter().map(|s| s.to_string()).collect();

        if self.scenarios_dir.is_dir() {
            for entry in std::fs::read_dir(&self.scenarios_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    names.push(derive_scenario_name(&path));
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    fn load(path: &Path) -> Result<ResolvedScenario, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ScenarioError(format!(
                "Failed to read scenario file {}: {e}",
                path.display()
            ))
        })?;

        let mut scenario: Scenario = serde_json::from_str(&raw).map_err(|e| {
            AppError::ScenarioError(format!(
                "Invalid scenario file {}: {e}",
                path.display()
            ))
        })?;
        if scenario.name.trim().is_empty() {
            scenario.name = derive_scenario_name(path);
        }
        scenario.validate()?;

        Ok(ResolvedScenario {
            path: Some(path.to_path_buf()),
            scenario,
        })
    }
}
