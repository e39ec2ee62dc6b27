//! Search scopes and their request scheduling.

pub mod debounce;

mod filter_scope;
pub use filter_scope::{FilterEvent, FilterScope};

mod suggest_scope;
pub use suggest_scope::SuggestScope;

mod scope_registry;
pub use scope_registry::ScopeRegistry;

#[cfg(test)]
mod test_support;
