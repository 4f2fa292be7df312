mod cache;
mod engine;
mod environment;
mod outcome;
mod validator;

pub use cache::{SelectorInput, ValidatorCache, env_input, fixed_input};
pub use engine::PolicyEngine;
pub use environment::{EnvSnapshot, build_environment};
pub use outcome::ValidationOutcome;
pub use validator::{CompiledPolicy, Validator, enforced_level};
