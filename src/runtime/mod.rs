mod executor;
mod spawn;

pub use executor::{ExecOptions, Executor, format_output};
pub use spawn::{ProcessSpawner, SpawnOutput, SpawnRequest, Spawner};

/// Executor shared between tools; held for a whole request
pub type SharedExecutor = std::sync::Arc<tokio::sync::Mutex<Executor>>;
