//! Integration tests for newsweep
//!
//! These tests drive the coordinators, pipelines and workers end-to-end, using
//! wiremock to serve feeds and article pages.

mod coordination_tests;
mod pipeline_tests;
mod worker_tests;
