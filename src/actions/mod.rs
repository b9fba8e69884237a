//! Declarative player actions
//!
//! Actions are data: a cost, availability predicates and effects, loaded
//! from TOML. A generic executor interprets them against the world.

pub mod catalog;
pub mod effect;
pub mod executor;
pub mod predicate;
pub mod property;

pub use catalog::{ActionCatalog, ActionDescriptor, TargetType, ValidationReport};
pub use effect::{Effect, EffectMethod, EffectOp, EffectTarget, Receiver, ResolvedTarget};
pub use executor::{execute_action, is_action_available, ActionContext, WorldView};
pub use predicate::{Collections, Comparator, Filter, Predicate, PredicateKind, Scope};
pub use property::{Literal, PropertySource, Value};
