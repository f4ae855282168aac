//! Plugins compiled into the CLI.

mod hello;

pub use hello::{HELLO_COMMAND, HelloPlugin};
