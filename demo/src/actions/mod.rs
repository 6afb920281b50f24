//! Demo actions and registry assembly.

mod calculator;
mod profile;

use ext_direct::ActionRegistry;

/// Build the registry with every demo action.
pub fn build_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(calculator::action());
    registry.register(profile::action());
    registry
}
