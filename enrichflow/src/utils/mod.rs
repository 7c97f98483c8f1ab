//! Timestamp and string utilities.

mod strings;
mod timestamps;

pub use strings::{env_file_name, fix_output, fix_prompt};
pub use timestamps::{format_iso8601, iso_timestamp, Timestamp};
