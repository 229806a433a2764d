//! Digestwatch Core
//!
//! Core types and logic for the digestwatch change monitor.
//!
//! This crate contains:
//! - Marker comparison: deciding whether an upstream signal changed
//! - Image references: deriving registry tags from repository URLs
//! - Repository specs: the declarative input of the build pipeline
//!
//! Everything here is pure; fetching, persistence and subprocess work live
//! in the client crate and the binary.

pub mod image;
pub mod marker;
pub mod repo;
