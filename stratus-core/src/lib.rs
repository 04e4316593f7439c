//! Stratus Core
//!
//! Core library for cloud providers: the resource and state model, the
//! Provider trait, attribute schemas, and the waiter that tracks
//! long-running vendor operations.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
