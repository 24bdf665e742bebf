pub mod bootstrap;
pub mod cli;
pub mod converter;
pub mod format;
pub mod relocate;
pub mod writer;

pub use converter::{run_loader, run_tap};
