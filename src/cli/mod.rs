//! Command-line interface definitions and the demo system it operates on.

mod commands;
mod demo;

pub use commands::{Cli, Commands, PrintTarget};
pub use demo::{demo_system, session_for_email};
