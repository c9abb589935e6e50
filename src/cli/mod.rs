//! Command-line front end: parses arguments, drives the note store and
//! renders its results.
mod app;
mod args;

pub use app::*;
pub use args::*;
