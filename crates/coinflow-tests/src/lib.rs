//! Property and end-to-end test suite for Coinflow.
//!
//! The integration tests under `tests/` drive the transaction pool, the
//! balance adapter and the send session through an in-memory chain.

pub mod helpers;
