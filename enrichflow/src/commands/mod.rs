//! Command trait and implementations.
//!
//! Commands are the units of work a chain runs. A command holds no
//! per-invocation state: the same instance is built once at startup and
//! executed against any number of contexts, concurrently.

mod chain;

pub use chain::{Chain, ChainState};

use crate::context::Context;
use crate::errors::CommandError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::Debug;
use tracing::Instrument;

/// Trait for commands.
///
/// A command reads keys from and writes keys to the context it is given.
/// Returning an error aborts the enclosing chain; errors a command wants to
/// survive go to `Context::add_error` instead.
#[async_trait]
pub trait Command: Send + Sync + Debug {
    /// Returns the name of the command.
    fn name(&self) -> &str;

    /// Executes the command against a context.
    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError>;
}

/// Span wrapping one leaf command execution.
fn command_span(name: &str, ctx: &Context) -> tracing::Span {
    tracing::info_span!(
        "command",
        command.name = %name,
        context.size = ctx.len(),
        run_id = %ctx.run_id(),
    )
}

/// A command bound to a synchronous function.
pub struct FnCommand<F>
where
    F: Fn(&mut Context) -> Result<(), CommandError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&mut Context) -> Result<(), CommandError> + Send + Sync,
{
    /// Creates a new function-based command.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnCommand<F>
where
    F: Fn(&mut Context) -> Result<(), CommandError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCommand").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Command for FnCommand<F>
where
    F: Fn(&mut Context) -> Result<(), CommandError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        let span = command_span(&self.name, ctx);
        let _entered = span.enter();
        (self.func)(ctx)
    }
}

/// A command bound to an asynchronous function.
///
/// The function receives the context by mutable reference and returns a
/// boxed future borrowing it:
///
/// ```rust,ignore
/// fn detect(ctx: &mut Context) -> BoxFuture<'_, Result<(), CommandError>> {
///     Box::pin(async move {
///         ctx.set("seen", true);
///         Ok(())
///     })
/// }
///
/// let command = AsyncFnCommand::new("detect", detect);
/// ```
pub struct AsyncFnCommand<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), CommandError>> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> AsyncFnCommand<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), CommandError>> + Send + Sync,
{
    /// Creates a new async function-based command.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for AsyncFnCommand<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), CommandError>> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnCommand")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Command for AsyncFnCommand<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), CommandError>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        let span = command_span(&self.name, ctx);
        (self.func)(ctx).instrument(span).await
    }
}

/// A command that does nothing.
#[derive(Debug, Clone)]
pub struct NoOpCommand {
    name: String,
}

impl NoOpCommand {
    /// Creates a new no-op command.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Command for NoOpCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _ctx: &mut Context) -> Result<(), CommandError> {
        Ok(())
    }
}
