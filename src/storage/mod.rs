//! Progression storage for questlog.
//!
//! This module provides persistence for the profile, tasks, habits and
//! habit logs, with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::ProgressStore;
