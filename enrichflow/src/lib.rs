//! # Enrichflow
//!
//! Command chains over a shared per-request context, built for enriching
//! product data with generative models.
//!
//! Enrichflow provides:
//!
//! - **Commands and chains**: named, stateless units of work composed into
//!   ordered chains that are themselves commands
//! - **Context**: the per-request state bag with `${key}` template expansion
//!   and a soft-error list
//! - **Configuration**: TOML settings with per-environment overrides, a
//!   prompt catalog and the generator registry
//! - **Providers**: `Generator` / `Embedder` traits with a Gemini backend
//! - **Event-driven observability**: lifecycle events for every chain run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enrichflow::prelude::*;
//!
//! let configuration = Arc::new(Configuration::load("env.toml")?);
//! let chain = product_enrichment_from_image();
//!
//! let mut ctx = Context::new(configuration);
//! seed_context(&mut ctx, ImageHandle::from_path("shirt.jpeg")?, &[]);
//! chain.execute(&mut ctx).await?;
//!
//! println!("{}", ctx.get_text(PRODUCT_JSON).unwrap_or_default());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod commands;
pub mod config;
pub mod context;
pub mod enrichment;
pub mod errors;
pub mod events;
pub mod observability;
pub mod providers;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{AsyncFnCommand, Chain, ChainState, Command, FnCommand, NoOpCommand};
    pub use crate::config::{Configuration, NamedPrompt, Settings};
    pub use crate::context::{Context, ImageHandle, Value};
    pub use crate::enrichment::{
        product_enrichment_from_image, seed_context, PRODUCT_IMAGE, PRODUCT_JSON,
    };
    pub use crate::errors::{CommandError, ConfigError, ContextError, GenerationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::providers::{Embedder, Generator};
}
