#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use termgate::config::{LevelSelector, PolicyLoader};
use termgate::validation::{EnvSnapshot, SelectorInput, ValidatorCache, fixed_input};
use termgate::{
    BoundaryConfig, BoundaryGuard, Executor, SharedExecutor, SpawnOutput, SpawnRequest, Spawner,
    ToolRegistry,
};

/// A mock spawner that replays scripted results in order and records requests.
///
/// When the script runs out it answers with empty output and exit code 0.
#[derive(Default)]
pub struct MockSpawner {
    script: Mutex<VecDeque<Result<SpawnOutput>>>,
    requests: Mutex<Vec<SpawnRequest>>,
}

impl MockSpawner {
    pub fn with_script(script: Vec<Result<SpawnOutput>>) -> Self {
        Self {
            script: Mutex::new(VecDeque::from(script)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SpawnRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Spawner for MockSpawner {
    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutput> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SpawnOutput::default()))
    }
}

pub fn output(stdout: &str, stderr: &str, exit_code: i32) -> Result<SpawnOutput> {
    Ok(SpawnOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
    })
}

/// Snapshot standing in for the server's environment.
pub fn test_env() -> EnvSnapshot {
    [
        ("PATH", "/usr/bin:/bin"),
        ("HOME", "/home/agent"),
        ("USER", "agent"),
        ("SHELL", "/bin/bash"),
        ("API_KEY", "do-not-leak"),
    ]
    .into_iter()
    .collect()
}

/// Executor at a fixed selector, confined to `root`, with a mock spawner.
pub fn test_executor(
    selector: &str,
    root: &Path,
    policy_dir: Option<&Path>,
    spawner: Arc<MockSpawner>,
) -> Executor {
    executor_with_input(
        fixed_input(Some(selector.to_string())),
        root,
        policy_dir,
        spawner,
    )
}

/// Executor reading its selector from `input` on every lookup.
pub fn executor_with_input(
    input: SelectorInput,
    root: &Path,
    policy_dir: Option<&Path>,
    spawner: Arc<MockSpawner>,
) -> Executor {
    let cache = ValidatorCache::new(
        LevelSelector::new(None, root),
        input,
        PolicyLoader::new(policy_dir.map(Path::to_path_buf)),
        test_env(),
    );
    let guard = BoundaryGuard::new(BoundaryConfig {
        root_directory: root.to_path_buf(),
        escape_enabled: false,
    });
    Executor::new(cache, guard, spawner)
}

pub fn test_registry(executor: Executor) -> ToolRegistry {
    let shared: SharedExecutor = Arc::new(tokio::sync::Mutex::new(executor));
    ToolRegistry::terminal(shared)
}
