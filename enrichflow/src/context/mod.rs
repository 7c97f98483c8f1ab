//! Per-invocation context management.
//!
//! This module provides:
//! - The closed [`Value`] union stored in a context
//! - The mutable [`Context`] handed to every command of a run
//! - `${key}` template expansion against a context

#[cfg(test)]
mod context_tests;
mod execution;
pub mod template;
mod value;

pub use execution::Context;
pub use template::{expand, placeholders, Lookup};
pub use value::{ImageHandle, Value};
