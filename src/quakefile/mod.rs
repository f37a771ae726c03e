//! Quakefile parsing and loading
//!
//! This module turns Quakefile source into its syntax tree, discovers and
//! merges fragment files, and validates the merged result.

pub mod command;
pub mod expression;
pub mod grammar;
pub mod lexer;
pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use grammar::parse_quakefile;
pub use parse::*;
pub use schema::*;
pub use types::*;
