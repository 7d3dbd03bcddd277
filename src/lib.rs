pub mod addon;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod platform;
pub mod release;
pub mod runtime;
