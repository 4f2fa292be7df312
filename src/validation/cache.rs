use tracing::{debug, info, warn};

use super::engine::PolicyEngine;
use super::environment::EnvSnapshot;
use crate::config::{LevelSelector, PolicyLoader, SELECTOR_VAR, Selection};

/// Source of the raw selector value, consulted on every lookup.
pub type SelectorInput = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Selector input that always yields the same value.
pub fn fixed_input(value: Option<String>) -> SelectorInput {
    Box::new(move || value.clone())
}

/// Selector input read from the process environment on each lookup.
pub fn env_input() -> SelectorInput {
    Box::new(|| std::env::var(SELECTOR_VAR).ok())
}

/// Single-slot cache of the active policy engine, keyed by selection.
///
/// Every [`get`](Self::get) re-runs selection; the engine is rebuilt only when
/// the selection changes. Construction never leaves the slot empty: a policy
/// that fails to compile is replaced by the aggressive defaults.
pub struct ValidatorCache {
    selector: LevelSelector,
    input: SelectorInput,
    loader: PolicyLoader,
    env: EnvSnapshot,
    slot: Option<(Selection, PolicyEngine)>,
}

impl ValidatorCache {
    pub fn new(
        selector: LevelSelector,
        input: SelectorInput,
        loader: PolicyLoader,
        env: EnvSnapshot,
    ) -> Self {
        Self {
            selector,
            input,
            loader,
            env,
            slot: None,
        }
    }

    /// The engine for the current selection, building it on a miss.
    pub fn get(&mut self) -> &PolicyEngine {
        let raw = (self.input)();
        let selection = self.selector.select(raw.as_deref());

        if matches!(&self.slot, Some((cached, _)) if *cached == selection) {
            debug!(%selection, "policy cache hit");
        } else {
            self.slot = None;
        }

        let (loader, env) = (&self.loader, &self.env);
        let (_, engine) = self.slot.get_or_insert_with(|| {
            let engine = Self::build(loader, env, &selection);
            info!(%selection, level = %engine.level(), "policy engine built");
            (selection, engine)
        });
        engine
    }

    /// Drop the cached engine and build a fresh one, re-reading policy documents.
    pub fn recreate(&mut self) -> &PolicyEngine {
        self.slot = None;
        self.get()
    }

    /// Selection the cached engine was built for, if any.
    pub fn selection(&self) -> Option<&Selection> {
        self.slot.as_ref().map(|(selection, _)| selection)
    }

    fn build(loader: &PolicyLoader, env: &EnvSnapshot, selection: &Selection) -> PolicyEngine {
        let config = loader.load(selection);
        PolicyEngine::new(config, env.clone()).unwrap_or_else(|e| {
            warn!(%selection, error = %e, "failed to build policy engine, using aggressive defaults");
            PolicyEngine::strictest(env.clone())
        })
    }
}
