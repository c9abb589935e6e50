//! Prioritized note store library
//!
//! This library provides an authoritative, newest-first collection of notes
//! with a closed Low/Medium/High priority, mirrored to a pluggable
//! persistence backend (memory, JSON files, or background write-behind).

mod adapter;
mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod priority;
mod storage;
mod store;
mod types;
mod write_behind;

// Re-export key components
pub use adapter::*;
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use priority::*;
pub use storage::*;
pub use store::*;
pub use types::*;
pub use write_behind::*;
