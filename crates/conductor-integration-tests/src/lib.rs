#![deny(unsafe_code)]
#![deny(clippy::all)]
//! Integration test crate for the conductor agent runtime.
//!
//! This crate exists solely for cross-component scenario testing. It is
//! `publish = false` and has no library code — all tests live in `tests/`.
