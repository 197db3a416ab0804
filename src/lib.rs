// alertmail library crate
// Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod storage;
