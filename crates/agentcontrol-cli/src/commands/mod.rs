//! Subcommand implementations.

pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod plugins;
pub(crate) mod run;
pub(crate) mod sandbox;
