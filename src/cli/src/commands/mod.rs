//! Subcommand implementations.

pub mod agent;
pub mod auth;
pub mod book;
pub mod config;
pub mod dashboard;
pub mod packages;
