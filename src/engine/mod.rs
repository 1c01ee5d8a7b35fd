//! # Engine Module
//!
//! Internal storage-engine implementation.
//!
//! This module contains all core building blocks:
//! - Component registry and pools
//! - Entity management
//! - Archetype graph and cached transition edges
//! - Query maintenance
//! - Deferred commands and playback
//! - Scheduling and systems
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod bitmask;
pub mod component;
pub mod pool;
pub mod entity;
pub mod archetype;
pub mod query;
pub mod commands;
pub mod world;
pub mod systems;
pub mod scheduler;
pub mod random;
