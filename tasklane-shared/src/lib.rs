//! # Tasklane Shared Library
//!
//! Domain types and business logic behind the Tasklane API server: the
//! record store, the query engine, and identity and access.
//!
//! ## Module Organization
//!
//! - `models`: User and task records and their input types
//! - `store`: In-memory record store with durable snapshots
//! - `query`: Statistics and admin listings over a store snapshot
//! - `auth`: Password hashing, tokens, accounts and role checks

pub mod auth;
pub mod models;
pub mod query;
pub mod store;

/// Current version of the Tasklane shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
