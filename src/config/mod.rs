mod defaults;
mod loader;
mod policy;
mod selector;
mod server;

pub use defaults::builtin;
pub use loader::{POLICY_SUFFIXES, PolicyLoader, has_policy_suffix, read_document};
pub use policy::{
    CommandRule, EnvironmentPolicy, Limits, PathRestriction, PolicyConfig, SecurityLevel,
    UNLIMITED, limit,
};
pub use selector::{LevelSelector, Selection};
pub use server::{
    BOUNDARY_DIR_VAR, BOUNDARY_ESCAPE_VAR, POLICY_DIR_VAR, SELECTOR_VAR, ServerConfig,
};
