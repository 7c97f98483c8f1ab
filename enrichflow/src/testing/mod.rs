//! Testing utilities for chains and commands.
//!
//! This module provides:
//! - Mock commands (recording, failing, slow) and mock providers
//! - Configuration and context fixtures
//! - Assertions over logs and emitted events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_event_sequence, assert_log, assert_no_errors};
pub use fixtures::{
    empty_context, observed_context, sample_image, sample_prompts, test_configuration,
};
pub use mocks::{
    read_log, FailingCommand, MockEmbedder, MockGenerator, RecordingCommand, SlowCommand,
    SoftFailingCommand, LOG_KEY,
};
