//! Subcommand implementations. Each returns `anyhow::Result<()>`; a
//! cancelled selection is a normal return.

pub mod clean;
pub mod clone;
pub mod delete;
pub mod fetch;
pub mod history;
pub mod info;
pub mod list;
pub mod pop;
pub mod pr;
pub mod switch;
