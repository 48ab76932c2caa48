//! Subcommand implementations.

pub mod codec;
pub mod import;
pub mod indexes;
pub mod query;
pub mod search;
pub mod serve;
pub mod status;
