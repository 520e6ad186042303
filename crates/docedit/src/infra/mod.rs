//! Infrastructure adapters for files, configuration, and external commands.

pub mod command;
pub mod config;
pub mod document;
