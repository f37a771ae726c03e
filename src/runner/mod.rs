//! Task execution engine
//!
//! This module handles the execution of tasks: dependency ordering, argument
//! and namespace scoping, command rendering and shell execution.

pub mod command;
pub mod context;
pub mod echo;
pub mod evaluator;
pub mod external;
pub mod interpolate;
pub mod render;

// Re-export main types
pub use command::*;
pub use context::*;
pub use evaluator::*;
pub use external::*;
pub use interpolate::*;
pub use render::*;
