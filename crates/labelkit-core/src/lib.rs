//! Core orchestration engine for labelkit: status event bus, external
//! process supervision, environment provisioning, and the dataset split
//! pipeline. Frontends (CLI, TUI) drive the entry points in [`commands`]
//! and render the [`events::Event`] stream.

pub mod commands;
pub mod config;
pub mod dataset;
pub mod events;
pub mod paths;
pub mod process;
pub mod provision;
