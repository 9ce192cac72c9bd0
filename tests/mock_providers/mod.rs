//! Mock provider servers for integration tests.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;
