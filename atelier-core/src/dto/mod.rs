//! Data Transfer Objects
//!
//! This module contains DTOs used at Atelier's boundaries: the progress report
//! handed to the UI layer and the request/response pair exchanged with an HTTP
//! image generator.

pub mod batch;
pub mod generate;
