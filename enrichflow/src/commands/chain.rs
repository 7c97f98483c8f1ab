//! Ordered composition of commands.

use super::Command;
use crate::context::Context;
use crate::errors::CommandError;
use crate::events::event_types;
use crate::observability::SpanTimer;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// Lifecycle of a single chain invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    /// Not yet started.
    NotStarted,
    /// Children are executing.
    Running,
    /// Every child completed.
    Finished,
    /// A child failed; later children did not run.
    Aborted,
}

impl std::fmt::Display for ChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// A command that runs its children in order against the same context.
///
/// Chains nest: a chain is itself a [`Command`], so a chain of chains
/// behaves like the flattened sequence. There is no branching, retry or
/// skip logic here; whether a child does anything is the child's decision.
///
/// `add_command` and `remove_command` take `&mut self`, so a chain shared
/// behind an `Arc` for concurrent execution cannot be modified.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    commands: Vec<Arc<dyn Command>>,
}

impl Chain {
    /// Creates a chain from an ordered list of commands.
    #[must_use]
    pub fn new(name: impl Into<String>, commands: Vec<Arc<dyn Command>>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    /// Appends a command.
    pub fn add_command(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Appends a command, builder style.
    #[must_use]
    pub fn with_command(mut self, command: Arc<dyn Command>) -> Self {
        self.add_command(command);
        self
    }

    /// Removes the first command with the given name, returning it.
    pub fn remove_command(&mut self, name: &str) -> Option<Arc<dyn Command>> {
        let index = self.commands.iter().position(|c| c.name() == name)?;
        Some(self.commands.remove(index))
    }

    /// Returns the commands in execution order.
    #[must_use]
    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if the chain has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    async fn run(&self, ctx: &mut Context) -> Result<(), CommandError> {
        let timer = SpanTimer::start(&self.name);
        ctx.try_emit_event(
            event_types::CHAIN_STARTED,
            Some(serde_json::json!({
                "chain": self.name,
                "commands": self.commands.len(),
                "state": ChainState::Running,
            })),
        );

        for (index, command) in self.commands.iter().enumerate() {
            ctx.try_emit_event(
                event_types::COMMAND_STARTED,
                Some(serde_json::json!({
                    "chain": self.name,
                    "command": command.name(),
                    "index": index,
                })),
            );

            let command_timer = SpanTimer::start(command.name());
            if let Err(err) = command.execute(ctx).await {
                warn!(
                    chain = %self.name,
                    command = %command.name(),
                    error = %err,
                    "Chain aborted"
                );
                ctx.try_emit_event(
                    event_types::CHAIN_ABORTED,
                    Some(serde_json::json!({
                        "chain": self.name,
                        "command": command.name(),
                        "index": index,
                        "error": err.to_string(),
                        "error_kind": err.kind(),
                        "state": ChainState::Aborted,
                        "duration_ms": timer.elapsed_ms(),
                    })),
                );
                return Err(err);
            }

            ctx.try_emit_event(
                event_types::COMMAND_FINISHED,
                Some(serde_json::json!({
                    "chain": self.name,
                    "command": command.name(),
                    "index": index,
                    "duration_ms": command_timer.finish(),
                })),
            );
        }

        let soft_errors = ctx.errors().len();
        if soft_errors > 0 {
            warn!(chain = %self.name, soft_errors, "Chain finished with recorded errors");
        } else {
            debug!(chain = %self.name, "Chain finished");
        }

        ctx.try_emit_event(
            event_types::CHAIN_FINISHED,
            Some(serde_json::json!({
                "chain": self.name,
                "state": ChainState::Finished,
                "soft_errors": soft_errors,
                "duration_ms": timer.finish(),
            })),
        );
        Ok(())
    }
}

#[async_trait]
impl Command for Chain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &mut Context) -> Result<(), CommandError> {
        let span = tracing::info_span!("chain", chain.name = %self.name, run_id = %ctx.run_id());
        self.run(ctx).instrument(span).await
    }
}
