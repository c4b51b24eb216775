//! # Enrollment
//!
//! Keeps `person`, `course` and `person_course` consistent across the
//! mutations that touch more than one of them.
//!
//! - Person creation with its initial courses is atomic.
//! - Batch enrollment is best-effort: every course id is validated and
//!   inserted on its own, and the failures are collected into one
//!   [`BatchEnrollError`].
//! - Person update is additive: it can add enrollments, never remove them.
//! - Person deletion removes the association rows before the person row.
//!
//! Only creation runs in a transaction. The other operations issue their
//! statements one after another, so a concurrent reader may observe the
//! steps in between.

pub mod error;
pub mod manager;

pub use error::{BatchEnrollError, EnrollmentError, EnrollmentFailure, FailureReason};
pub use manager::EnrollmentManager;
