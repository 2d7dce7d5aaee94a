//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`] - agent, session and decision identifiers
//! - [`error::DomainError`] - configuration errors
//! - [`json`] - lenient JSON extraction from model output
//! - [`string`] - text helpers used by prompts and self-questioning

pub mod error;
pub mod ids;
pub mod json;
pub mod string;
