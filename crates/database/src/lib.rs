//! # Roster Database Crate
//!
//! This crate is the entity store of the service: the `course`, `person` and
//! `person_course` tables in PostgreSQL, and everything needed to reach them.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. Callers see the [`CourseStore`] and
//!   [`PersonStore`] traits and never build queries themselves.
//! - **Explicit handles:** The pool is created once by [`connect`] and passed
//!   into [`DbRepository`]; there is no global connection.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a `PgPool`.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies the embedded schema migrations.
//! - `DbRepository`: The PostgreSQL implementation of the store traits.
//! - `MemoryStore`: An in-process implementation for tests (feature `memory`).
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
#[cfg(any(test, feature = "memory"))]
pub use memory::{MemoryStore, StoreOp};
pub use repository::DbRepository;
pub use store::{CourseStore, EntityStore, PersonStore};
