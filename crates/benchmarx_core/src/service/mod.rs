//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository reads and the pure scoring engine into the
//!   scoring, ranking, materialization and simulation use-cases.
//! - Keep the CLI decoupled from storage details.

pub mod scoring_service;
