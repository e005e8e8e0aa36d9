//! Atelier Core
//!
//! Core types and abstractions for Atelier batch image direction.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, VariantSpec, Selection, etc.)
//! - Generator: The capability contract for the external image generator
//! - DTOs: Data transfer objects for the UI layer and the generator wire

pub mod domain;
pub mod dto;
pub mod generator;

pub use generator::Generator;
