//! Shared vocabulary for the facegen binding generator.
//!
//! This crate holds the pieces every pipeline stage agrees on:
//!
//! - [`error`]: the generation error taxonomy ([`error::GenError`])
//! - [`names`]: the pure derived-name transforms that turn a declared
//!   feature name into every identifier appearing in generated output

pub mod error;
pub mod names;
