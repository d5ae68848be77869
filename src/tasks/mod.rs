//! Background Tasks Module
//!
//! # Tasks
//! - TTL Purge: Removes expired entries from the in-process store at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
