pub mod boundary;
pub mod config;
pub mod error;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod validation;

pub use boundary::{BoundaryConfig, BoundaryGuard};
pub use config::{
    LevelSelector, PolicyConfig, PolicyLoader, SecurityLevel, Selection, ServerConfig,
};
pub use error::TermgateError;
pub use runtime::{
    ExecOptions, Executor, ProcessSpawner, SharedExecutor, SpawnOutput, SpawnRequest, Spawner,
};
pub use session::SessionState;
pub use tools::{Tool, ToolRegistry};
pub use validation::{EnvSnapshot, PolicyEngine, ValidationOutcome, Validator, ValidatorCache};
