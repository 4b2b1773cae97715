//! Core domain types and utilities for ticker-agent.
//!
//! This crate provides the foundational types, error handling, and shared
//! identifiers used throughout the stock-analysis agent service.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, RunId, TurnId};
