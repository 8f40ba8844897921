//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ErrorKind`] — the failure taxonomy for a run
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — preview helpers for logs and traces

pub mod error;
pub mod string;
