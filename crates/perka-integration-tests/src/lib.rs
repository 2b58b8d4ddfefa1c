//! Integration test crate for the Perka settlement engine.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end settlement flows across multiple workspace
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p perka-integration-tests
//! ```
