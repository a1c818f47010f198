//! Guards that enforce registered rules at mutation and invocation time
//!
//! Architectural Principle: Service Layer - Guards consult a RuleSet and fail fast
//! - AttributeGuard checks a field value before the assignment takes effect
//! - CallGuard binds call arguments, checks them, and only then runs the callable
//! - Neither guard logs violations; they are returned to the caller

pub mod attribute;
pub mod call;

pub use attribute::{AttributeGuard, GuardedObject};
pub use call::CallGuard;
