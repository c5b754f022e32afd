//! Command implementations for the CLI
//!
//! - start: Serve the query API and run scheduled ingestion
//! - ingest: Run one ingestion pass in the foreground
//! - clear: Delete a location's observations for one date
//! - locations: List configured and stored locations
//! - stats: Display store statistics
//! - test: Test configuration validity and store access
//! - config: Configuration display and validation

pub mod clear;
pub mod config;
pub mod ingest;
pub mod locations;
pub mod start;
pub mod stats;
