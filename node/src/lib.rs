#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible to the other modules
mod fmt;

pub mod app;
pub mod config;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use app::{App, Board, StartupError};
pub use config::{NodeConfig, Timing};
pub use store::{NodeStore, ReadingStore, ReadingWatch, ReadingWriter, CONSUMERS};
