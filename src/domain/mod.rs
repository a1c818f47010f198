//! Domain layer for Rule Guard
//!
//! Architecture: Domain Model - Values, violations and errors shared by every layer
//! - `value` defines the dynamically typed values that rules inspect
//! - `violations` defines the error and report types guards return

pub mod value;
pub mod violations;

// Re-export main domain types for convenience
pub use value::Value;
pub use violations::*;
