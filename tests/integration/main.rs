//! Integration test binary: all integration tests share one binary.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod conversation_flow;
mod reminders;
