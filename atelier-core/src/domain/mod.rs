//! Core domain types
//!
//! This module contains the core domain structures used across Atelier crates.
//! These types are shared between the orchestrator (which owns job state) and
//! generator implementations (which only ever see a variant spec).

pub mod batch;
pub mod job;
pub mod selection;
pub mod variant;
